use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, Condition, Order};
use serde::{Deserialize, Serialize};

use crate::entities::{kollection_item, music_release};
use crate::error::{CatalogError, CatalogResult};
use crate::repository::{PageRequest, contains_pattern};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Title,
    ReleaseYear,
    OrigReleaseYear,
    #[default]
    DateAdded,
    LastModified,
}

impl SortBy {
    fn column(self) -> music_release::Column {
        match self {
            SortBy::Title => music_release::Column::Title,
            SortBy::ReleaseYear => music_release::Column::ReleaseYear,
            SortBy::OrigReleaseYear => music_release::Column::OrigReleaseYear,
            SortBy::DateAdded => music_release::Column::DateAdded,
            SortBy::LastModified => music_release::Column::LastModified,
        }
    }

    /// Title sorts ascending by default, everything else newest first.
    fn default_order(self) -> SortOrder {
        match self {
            SortBy::Title => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Query parameters accepted by `GET /api/musicreleases`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicReleaseFilter {
    pub search: Option<String>,
    pub artist_id: Option<i64>,
    pub genre_id: Option<i64>,
    pub label_id: Option<i64>,
    pub country_id: Option<i64>,
    pub format_id: Option<i64>,
    pub packaging_id: Option<i64>,
    pub live: Option<bool>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub kollection_id: Option<i64>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl MusicReleaseFilter {
    pub fn validate(&self) -> CatalogResult<()> {
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(CatalogError::Validation(format!(
                    "yearFrom ({from}) must not be greater than yearTo ({to})"
                )));
            }
        }
        Ok(())
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// Everything the filter constrains, scoped to one owner.
    pub fn condition(&self, user_id: i64) -> Condition {
        let mut condition = Condition::all().add(music_release::Column::UserId.eq(user_id));

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(music_release::Column::Title.like(contains_pattern(search)))
                    .add(music_release::Column::LabelNumber.like(contains_pattern(search)))
                    .add(music_release::Column::Upc.like(contains_pattern(search))),
            );
        }
        if let Some(artist_id) = self.artist_id {
            condition = condition.add(json_ids_contain(music_release::Column::Artists, artist_id));
        }
        if let Some(genre_id) = self.genre_id {
            condition = condition.add(json_ids_contain(music_release::Column::Genres, genre_id));
        }
        let references = [
            (music_release::Column::LabelId, self.label_id),
            (music_release::Column::CountryId, self.country_id),
            (music_release::Column::FormatId, self.format_id),
            (music_release::Column::PackagingId, self.packaging_id),
        ];
        for (column, id) in references {
            if let Some(id) = id {
                condition = condition.add(column.eq(id));
            }
        }
        if let Some(live) = self.live {
            condition = condition.add(music_release::Column::Live.eq(live));
        }
        if let Some(from) = self.year_from {
            condition = condition.add(music_release::Column::ReleaseYear.gte(from));
        }
        if let Some(to) = self.year_to {
            condition = condition.add(music_release::Column::ReleaseYear.lte(to));
        }
        if let Some(kollection_id) = self.kollection_id {
            condition = condition.add(
                music_release::Column::Id.in_subquery(
                    Query::select()
                        .column(kollection_item::Column::MusicReleaseId)
                        .from(kollection_item::Entity)
                        .and_where(kollection_item::Column::KollectionId.eq(kollection_id))
                        .to_owned(),
                ),
            );
        }

        condition
    }

    /// Requested sort with `id` as tie-breaker so paging is stable.
    pub fn order_by(&self) -> Vec<(music_release::Column, Order)> {
        let sort_by = self.sort_by.unwrap_or_default();
        let order = self.sort_order.unwrap_or_else(|| sort_by.default_order());
        vec![
            (sort_by.column(), order.into()),
            (music_release::Column::Id, order.into()),
        ]
    }
}

/// Matches a compact JSON id array (`[1,2,3]`) containing `id`.
pub fn json_ids_contain(column: music_release::Column, id: i64) -> Condition {
    Condition::any()
        .add(column.eq(format!("[{id}]")))
        .add(column.like(format!("[{id},%")))
        .add(column.like(format!("%,{id},%")))
        .add(column.like(format!("%,{id}]")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[test]
    fn test_year_range_validation() {
        let filter = MusicReleaseFilter {
            year_from: Some(1980),
            year_to: Some(1970),
            ..Default::default()
        };
        assert_eq!(
            filter.validate().unwrap_err().error_type(),
            ErrorType::ValidationError
        );

        let open_ended = MusicReleaseFilter {
            year_from: Some(1980),
            ..Default::default()
        };
        assert!(open_ended.validate().is_ok());

        let single_year = MusicReleaseFilter {
            year_from: Some(1972),
            year_to: Some(1972),
            ..Default::default()
        };
        assert!(single_year.validate().is_ok());
    }

    #[test]
    fn test_default_order() {
        let order = MusicReleaseFilter::default().order_by();
        assert!(matches!(
            order[0],
            (music_release::Column::DateAdded, Order::Desc)
        ));
        assert!(matches!(order[1].0, music_release::Column::Id));

        let by_title = MusicReleaseFilter {
            sort_by: Some(SortBy::Title),
            ..Default::default()
        }
        .order_by();
        assert!(matches!(by_title[0].1, Order::Asc));
    }

    #[test]
    fn test_query_string_shape() {
        let filter: MusicReleaseFilter = serde_json::from_value(serde_json::json!({
            "sortBy": "origReleaseYear",
            "sortOrder": "asc",
            "artistId": 4,
            "pageSize": 25
        }))
        .unwrap();
        assert_eq!(filter.sort_by, Some(SortBy::OrigReleaseYear));
        assert_eq!(filter.sort_order, Some(SortOrder::Asc));
        assert_eq!(filter.artist_id, Some(4));
        assert_eq!(filter.page_request().normalized(), (1, 25));
    }
}
