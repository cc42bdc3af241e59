//! Parallel relevance verification of candidates.
//!
//! Every candidate gets exactly one score, produced by an independent model
//! call. All calls for a query are launched together; one candidate failing
//! to score never aborts or delays its siblings, it just scores zero.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::llm::{CompletionOptions, LlmProvider, Message, ModelTier};
use crate::retrieval::Candidate;

use super::describe;
use super::parse;

/// The relevance verdict for one candidate.
///
/// Results are positionally aligned with the candidate slice they were
/// produced from; `evaluate_all` guarantees one result per input candidate.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Match confidence, 0-100.
    pub score: u8,
    /// The model's reasoning, or a description of the failure.
    pub explanation: String,
    /// True when the score degraded to 0 because of a model failure.
    pub failed: bool,
}

impl MatchResult {
    fn failure(explanation: impl Into<String>) -> Self {
        Self {
            score: 0,
            explanation: explanation.into(),
            failed: true,
        }
    }
}

/// Scores candidates against the queried item name.
pub struct MatchEvaluator {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    max_description_chars: usize,
}

const SCORING_SYSTEM_PROMPT: &str = "You judge whether a structured data item from a website \
is the item a user asked about. Respond with a JSON object of the form \
{\"score\": <integer 0-100>, \"explanation\": \"<one sentence>\"} where 100 means the item is \
certainly the one the user meant and 0 means it certainly is not.";

impl MatchEvaluator {
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

    /// Score every candidate against `item_name`, concurrently.
    ///
    /// Returns exactly one result per candidate, in candidate order.
    pub async fn evaluate_all(
        &self,
        query_id: &str,
        item_name: &str,
        candidates: &[Candidate],
    ) -> Vec<MatchResult> {
        let evaluations = candidates
            .iter()
            .map(|candidate| self.evaluate_one(query_id, item_name, candidate));

        // join_all preserves input order, keeping results aligned with
        // candidates regardless of completion order.
        join_all(evaluations).await
    }

    /// Score a single candidate. Infallible: every failure mode becomes a
    /// zero-score result.
    async fn evaluate_one(
        &self,
        query_id: &str,
        item_name: &str,
        candidate: &Candidate,
    ) -> MatchResult {
        match self.request_score(item_name, candidate).await {
            Ok(result) => {
                debug!(
                    query_id = %query_id,
                    candidate = %candidate.url,
                    score = result.score,
                    "Candidate scored"
                );
                result
            }
            Err(explanation) => {
                warn!(
                    query_id = %query_id,
                    candidate = %candidate.url,
                    reason = %explanation,
                    "Scoring failed for candidate, treating as non-match"
                );
                MatchResult::failure(explanation)
            }
        }
    }

    async fn request_score(
        &self,
        item_name: &str,
        candidate: &Candidate,
    ) -> Result<MatchResult, String> {
        let description = describe::item_description(
            &candidate.name,
            &candidate.schema_json,
            self.max_description_chars,
        );

        let messages = [
            Message::system(SCORING_SYSTEM_PROMPT),
            Message::user(format!(
                "The user asked about: \"{}\"\n\n{}\n\nIs this the item the user asked about?",
                item_name, description
            )),
        ];

        let response = self
            .llm
            .complete(&messages, ModelTier::Low, &self.options)
            .await
            .map_err(|e| format!("scoring request failed: {}", e))?;

        let value = parse::extract_json_object(&response.content)
            .ok_or_else(|| "scoring response was not a JSON object".to_string())?;

        let score = value
            .get("score")
            .and_then(|s| s.as_f64())
            .ok_or_else(|| "scoring response missing numeric 'score' field".to_string())?;

        let explanation = value
            .get("explanation")
            .and_then(|e| e.as_str())
            .unwrap_or("")
            .to_string();

        Ok(MatchResult {
            score: score.clamp(0.0, 100.0).round() as u8,
            explanation,
            failed: false,
        })
    }
}
