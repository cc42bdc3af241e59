//! Per-item extraction of the requested detail.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::llm::{CompletionOptions, LlmError, LlmProvider, Message, ModelTier};

use super::describe;
use super::parse;
use super::selection::MatchedItem;

/// Why an extraction attempt produced nothing.
///
/// A failed extraction drops its item from emission; it is never converted
/// into placeholder output.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Model(#[from] LlmError),

    #[error("extraction response was not a JSON object")]
    NotJson,

    #[error("extraction response carried no detail field")]
    MissingDetail,
}

/// Extracts the user's requested detail from a matched item's payload.
pub struct DetailExtractor {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    max_description_chars: usize,
}

const EXTRACTION_SYSTEM_PROMPT: &str = "You extract specific information from a structured data \
item. Respond with a JSON object of the form {\"detail\": \"<the requested information>\"}. \
Answer only from the item data; if the data does not contain the requested information, say so \
in the detail text.";

impl DetailExtractor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        options: CompletionOptions,
        max_description_chars: usize,
    ) -> Self {
        Self {
            llm,
            options,
            max_description_chars,
        }
    }

    /// Extract `details_requested` from one matched item.
    ///
    /// The fan-out over matched items lives in the pipeline; this method is
    /// one independent unit of that fan-out.
    pub async fn extract(
        &self,
        item_name: &str,
        details_requested: &str,
        item: &MatchedItem,
    ) -> Result<String, ExtractionError> {
        let description = describe::item_description(
            &item.candidate.name,
            &item.candidate.schema_json,
            self.max_description_chars,
        );

        let messages = [
            Message::system(EXTRACTION_SYSTEM_PROMPT),
            Message::user(format!(
                "The user asked about \"{}\" and wants to know: {}\n\n{}",
                item_name, details_requested, description
            )),
        ];

        let response = self
            .llm
            .complete(&messages, ModelTier::High, &self.options)
            .await?;

        let value =
            parse::extract_json_object(&response.content).ok_or(ExtractionError::NotJson)?;

        // Models answer under either of these names; accept both.
        let detail = value
            .get("detail")
            .or_else(|| value.get("extracted_detail"))
            .filter(|v| !v.is_null())
            .ok_or(ExtractionError::MissingDetail)?;

        let detail = match detail.as_str() {
            Some(s) => s.to_string(),
            None => detail.to_string(),
        };

        debug!(item = %item.candidate.url, "Detail extracted");
        Ok(detail)
    }
}
