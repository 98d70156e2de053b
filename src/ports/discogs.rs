use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

/// One page of a user's collection (folder 0, "All").
#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsCollectionPage {
    pub pagination: DiscogsPagination,
    #[serde(default)]
    pub releases: Vec<DiscogsCollectionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsPagination {
    pub page: u32,
    pub pages: u32,
    #[serde(default)]
    pub items: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsCollectionItem {
    /// The release id, not the collection instance id.
    pub id: i64,
    #[serde(default)]
    pub basic_information: Option<DiscogsBasicInformation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsBasicInformation {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscogsRelease {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub artists: Vec<DiscogsArtist>,
    #[serde(default)]
    pub labels: Vec<DiscogsLabel>,
    #[serde(default)]
    pub formats: Vec<DiscogsFormat>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub tracklist: Vec<DiscogsTrack>,
    #[serde(default)]
    pub images: Vec<DiscogsImage>,
    #[serde(default)]
    pub identifiers: Vec<DiscogsIdentifier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscogsArtist {
    pub name: String,
    /// Artist name variation as printed on this release.
    #[serde(default)]
    pub anv: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscogsLabel {
    pub name: String,
    #[serde(default)]
    pub catno: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscogsFormat {
    pub name: String,
    #[serde(default)]
    pub qty: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscogsTrack {
    #[serde(default)]
    pub position: String,
    /// `track`, `heading` or `index`.
    #[serde(default, rename = "type_")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub artists: Vec<DiscogsArtist>,
    #[serde(default)]
    pub sub_tracks: Vec<DiscogsTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscogsImage {
    /// `primary` or `secondary`.
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
    #[serde(default)]
    pub uri150: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscogsIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscogsSearchResult {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub format: Vec<String>,
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub catno: Option<String>,
    #[serde(default, alias = "cover_image")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Port trait wrapping the Discogs API capabilities used by the importer.
///
/// Implementations live in `services::discogs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DiscogsClient: Send + Sync {
    async fn collection_page(&self, username: &str, page: u32) -> Result<DiscogsCollectionPage>;
    async fn release(&self, release_id: i64) -> Result<DiscogsRelease>;
    async fn search_by_catalog_number(&self, catalog_number: &str)
    -> Result<Vec<DiscogsSearchResult>>;
    async fn image(&self, url: &str) -> Result<Vec<u8>>;
}
