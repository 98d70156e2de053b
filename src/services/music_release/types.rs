use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogResult;
use crate::services::lookup::LookupItem;

/* ---------- JSON columns ---------- */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInfo {
    pub store_id: Option<i64>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseImages {
    pub cover_front: Option<String>,
    pub cover_back: Option<String>,
    pub thumbnail: Option<String>,
}

impl ReleaseImages {
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        [&self.cover_front, &self.cover_back, &self.thumbnail]
            .into_iter()
            .filter_map(|name| name.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.file_names().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseLink {
    pub description: Option<String>,
    pub url: String,
    pub url_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medium {
    pub name: Option<String>,
    #[serde(default)]
    pub tracks: Vec<MediumTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediumTrack {
    pub title: String,
    pub index: i32,
    pub position: Option<String>,
    pub length_secs: Option<i32>,
    #[serde(default)]
    pub artists: Vec<i64>,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub live: bool,
}

/// Serializes an id list the compact way the JSON-array filters expect: `[1,2,3]`.
pub fn encode_ids(ids: &[i64]) -> String {
    let body: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("[{}]", body.join(","))
}

pub fn decode_ids(raw: &str) -> CatalogResult<Vec<i64>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_json<T: Serialize>(value: &Option<T>) -> CatalogResult<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(Into::into))
        .transpose()
}

pub fn decode_json<T: for<'de> Deserialize<'de>>(raw: &Option<String>) -> CatalogResult<Option<T>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
    }
}

/* ---------- API shapes ---------- */

/// Body of `POST`/`PUT /api/musicreleases`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicReleaseInput {
    pub title: String,
    pub release_year: Option<i32>,
    pub orig_release_year: Option<i32>,
    #[serde(default)]
    pub artists: Vec<i64>,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub live: bool,
    pub label_id: Option<i64>,
    pub country_id: Option<i64>,
    pub label_number: Option<String>,
    pub upc: Option<String>,
    pub length_in_seconds: Option<i32>,
    pub format_id: Option<i64>,
    pub packaging_id: Option<i64>,
    pub purchase_info: Option<PurchaseInfo>,
    pub images: Option<ReleaseImages>,
    pub links: Option<Vec<ReleaseLink>>,
    pub media: Option<Vec<Medium>>,
    pub discogs_id: Option<i64>,
}

/// A release with its lookup references resolved to names.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicReleaseDto {
    pub id: i64,
    pub title: String,
    pub release_year: Option<i32>,
    pub orig_release_year: Option<i32>,
    pub artists: Vec<LookupItem>,
    pub genres: Vec<LookupItem>,
    pub live: bool,
    pub label: Option<LookupItem>,
    pub country: Option<LookupItem>,
    pub label_number: Option<String>,
    pub upc: Option<String>,
    pub length_in_seconds: Option<i32>,
    pub format: Option<LookupItem>,
    pub packaging: Option<LookupItem>,
    pub purchase_info: Option<PurchaseInfo>,
    pub store: Option<LookupItem>,
    pub images: Option<ReleaseImages>,
    pub links: Vec<ReleaseLink>,
    pub media: Vec<Medium>,
    pub discogs_id: Option<i64>,
    pub date_added: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayDto {
    pub id: i64,
    pub music_release_id: i64,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    Release,
    Artist,
    Label,
    Genre,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub id: i64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ids_is_compact() {
        assert_eq!(encode_ids(&[]), "[]");
        assert_eq!(encode_ids(&[5]), "[5]");
        assert_eq!(encode_ids(&[1, 22, 333]), "[1,22,333]");
        assert_eq!(decode_ids("[1, 22,333]").unwrap(), vec![1, 22, 333]);
        assert_eq!(decode_ids("").unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_decode_json_tolerates_empty_columns() {
        assert_eq!(decode_json::<ReleaseImages>(&None).unwrap(), None);
        assert_eq!(
            decode_json::<ReleaseImages>(&Some("null".into())).unwrap(),
            None
        );
        let images = decode_json::<ReleaseImages>(&Some(
            r#"{"coverFront":"front.jpg","thumbnail":""}"#.into(),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(images.file_names().collect::<Vec<_>>(), vec!["front.jpg"]);
        assert!(decode_json::<ReleaseImages>(&Some("{broken".into())).is_err());
    }

    #[test]
    fn test_media_uses_camel_case() {
        let media = vec![Medium {
            name: Some("Vinyl 1".into()),
            tracks: vec![MediumTrack {
                title: "Halleluhwah".into(),
                index: 1,
                position: Some("B1".into()),
                length_secs: Some(1110),
                ..Default::default()
            }],
        }];
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json[0]["tracks"][0]["lengthSecs"], 1110);
    }
}
