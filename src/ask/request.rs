//! Query request type for the pipeline entry point.

use crate::retrieval::Candidate;
use serde::Deserialize;
use uuid::Uuid;

/// A single query invocation.
///
/// Optional inputs are modeled as `Option` fields; callers never probe for
/// the presence of attributes on some shared context.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    /// Correlation id attached to every log line of this invocation.
    #[serde(default = "new_query_id")]
    pub query_id: String,
    /// The name of the item the user is asking about.
    pub item_name: String,
    /// Free-form description of the information the user wants.
    pub details_requested: String,
    /// Site or collection scope for retrieval.
    pub site: String,
    /// Candidates already retrieved by an earlier turn; when present and
    /// non-empty these are preferred over a live retrieval call.
    #[serde(default)]
    pub prior_candidates: Option<Vec<Candidate>>,
}

fn new_query_id() -> String {
    Uuid::new_v4().to_string()
}

impl AskRequest {
    pub fn new(
        item_name: impl Into<String>,
        details_requested: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        Self {
            query_id: new_query_id(),
            item_name: item_name.into(),
            details_requested: details_requested.into(),
            site: site.into(),
            prior_candidates: None,
        }
    }

    pub fn with_prior_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.prior_candidates = Some(candidates);
        self
    }
}
