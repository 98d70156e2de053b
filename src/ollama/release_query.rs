use color_eyre::eyre::{Context, Result};
use ollama_native::Ollama;
use schemars::schema_for;
use tracing::{debug, instrument};

use crate::ports::query_translator::{QueryIntent, QueryTranslator};

pub struct OllamaQueryTranslator {
    ollama: Ollama,
    model: String,
}

impl OllamaQueryTranslator {
    pub fn new(url: &str, model: &str) -> Self {
        Self {
            ollama: Ollama::new(url),
            model: model.to_string(),
        }
    }
}

fn build_prompt(question: &str) -> String {
    format!(
        r#"
You translate questions about a personal record collection into a search filter.

Instructions:

- Fill only the fields the question actually constrains. Leave everything else null.
- Use `artist`, `genre`, `label`, `country` and `format` for names exactly as the user wrote them.
- "from the 70s" means yearFrom 1970 and yearTo 1979. A single year sets both bounds.
- Set `live` only when the user asks for live recordings (true) or studio recordings (false).
- Questions like "newest" or "latest additions" sort by dateAdded desc; "oldest" sorts by releaseYear asc.
- Return the filter as JSON in the given schema.

Question:
{question}
"#
    )
}

#[async_trait::async_trait]
impl QueryTranslator for OllamaQueryTranslator {
    #[instrument(skip(self))]
    async fn translate(&self, question: &str) -> Result<QueryIntent> {
        let json_schema = schema_for!(QueryIntent);
        let json_schema_str = serde_json::to_string_pretty(&json_schema)
            .wrap_err("Failed to convert JSON schema to string")?;

        let response = self
            .ollama
            .generate(&self.model)
            .prompt(&build_prompt(question))
            .format(&json_schema_str)
            .await
            .wrap_err("Ollama request failed")?;
        debug!("structured JSON output: {}", response.response);

        serde_json::from_str::<QueryIntent>(&response.response)
            .wrap_err("Ollama returned JSON that does not match the query schema")
    }
}
