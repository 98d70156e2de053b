use color_eyre::eyre::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured reading of a natural-language question about the collection.
///
/// Lookups are named, not numbered; the caller resolves names to ids.
#[derive(Debug, Clone, Default, PartialEq, JsonSchema, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
    /// Words that should appear in the release title.
    pub title_contains: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub label: Option<String>,
    pub country: Option<String>,
    pub format: Option<String>,
    pub live: Option<bool>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    /// One of `title`, `releaseYear`, `origReleaseYear`, `dateAdded`, `lastModified`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
}

/// Port trait turning a question into a [`QueryIntent`].
///
/// Implementations live in `ollama::release_query` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, question: &str) -> Result<QueryIntent>;
}
