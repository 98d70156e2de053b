use std::sync::Arc;

use sea_orm::{ColumnTrait, Condition, Order};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::database::Database;
use crate::entities::{artist, country, format, genre, label};
use crate::error::{CatalogError, CatalogResult};
use crate::ports::query_translator::{QueryIntent, QueryTranslator};
use crate::repository::{PageRequest, PagedResult, UnitOfWork, contains_pattern};
use crate::services::lookup::LookupEntity;
use crate::services::music_release::MusicReleaseService;
use crate::services::music_release::filter::{MusicReleaseFilter, SortBy, SortOrder};
use crate::services::music_release::types::MusicReleaseDto;

const MAX_QUESTION_LENGTH: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnswer {
    pub question: String,
    pub interpretation: QueryIntent,
    pub filter: MusicReleaseFilter,
    /// Names from the question that match nothing in the catalog.
    pub unresolved: Vec<String>,
    pub results: PagedResult<MusicReleaseDto>,
}

/// Resolves a name to a lookup id: exact match first, then the
/// alphabetically first row containing it.
async fn resolve<E>(uow: &UnitOfWork, name: &str) -> CatalogResult<Option<i64>>
where
    E: LookupEntity,
    E::Model: Sync,
{
    let repo = uow.repository::<E>();
    let order = [(E::name_column(), Order::Asc)];
    let exact = repo
        .first(Some(Condition::all().add(E::name_column().eq(name))), &order)
        .await?;
    let found = match exact {
        Some(found) => Some(found),
        None => {
            repo.first(
                Some(Condition::all().add(E::name_column().like(contains_pattern(name)))),
                &order,
            )
            .await?
        }
    };
    Ok(found.map(|model| E::to_item(&model).id))
}

fn parse_keyword<T: for<'de> Deserialize<'de>>(raw: Option<&str>) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(raw?.trim().to_string())).ok()
}

/// Answers natural-language questions by turning them into a release filter.
pub struct QueryService {
    db: Arc<Database>,
    releases: Arc<MusicReleaseService>,
    translator: Arc<dyn QueryTranslator>,
}

impl QueryService {
    pub fn new(
        db: Arc<Database>,
        releases: Arc<MusicReleaseService>,
        translator: Arc<dyn QueryTranslator>,
    ) -> Self {
        Self {
            db,
            releases,
            translator,
        }
    }

    #[instrument(skip(self))]
    pub async fn ask(
        &self,
        user_id: i64,
        question: &str,
        page: PageRequest,
    ) -> CatalogResult<QueryAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CatalogError::Validation("question is required".into()));
        }
        if question.chars().count() > MAX_QUESTION_LENGTH {
            return Err(CatalogError::Validation(format!(
                "question must be at most {MAX_QUESTION_LENGTH} characters"
            )));
        }

        let intent = self
            .translator
            .translate(question)
            .await
            .map_err(CatalogError::external)?;
        info!("Interpreted question as {intent:?}");

        let (filter, unresolved) = self.to_filter(&intent, page).await?;
        let results = if unresolved.is_empty() {
            self.releases.list(user_id, &filter).await?
        } else {
            let (page_number, page_size) = page.normalized();
            PagedResult::new(Vec::new(), page_number, page_size, 0)
        };

        Ok(QueryAnswer {
            question: question.to_string(),
            interpretation: intent,
            filter,
            unresolved,
            results,
        })
    }

    async fn to_filter(
        &self,
        intent: &QueryIntent,
        page: PageRequest,
    ) -> CatalogResult<(MusicReleaseFilter, Vec<String>)> {
        let uow = self.db.unit_of_work();
        let mut unresolved = Vec::new();

        macro_rules! lookup {
            ($entity:ty, $name:expr) => {
                match $name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                    Some(name) => {
                        let id = resolve::<$entity>(&uow, name).await?;
                        if id.is_none() {
                            unresolved.push(name.to_string());
                        }
                        id
                    }
                    None => None,
                }
            };
        }

        let artist_id = lookup!(artist::Entity, intent.artist);
        let genre_id = lookup!(genre::Entity, intent.genre);
        let label_id = lookup!(label::Entity, intent.label);
        let country_id = lookup!(country::Entity, intent.country);
        let format_id = lookup!(format::Entity, intent.format);

        let (year_from, year_to) = match (intent.year_from, intent.year_to) {
            (Some(from), Some(to)) if from > to => (Some(to), Some(from)),
            years => years,
        };

        let filter = MusicReleaseFilter {
            search: intent.title_contains.clone(),
            artist_id,
            genre_id,
            label_id,
            country_id,
            format_id,
            live: intent.live,
            year_from,
            year_to,
            sort_by: parse_keyword::<SortBy>(intent.sort_by.as_deref()),
            sort_order: parse_keyword::<SortOrder>(intent.sort_order.as_deref()),
            page: page.page,
            page_size: page.page_size,
            ..Default::default()
        };
        Ok((filter, unresolved))
    }
}
