//! Candidate acquisition for the query pipeline.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::retrieval::{Candidate, Retriever};

use super::request::AskRequest;

/// Default cap on how many candidates are fetched per query.
pub const DEFAULT_FETCH_LIMIT: usize = 20;

/// Supplies the ordered candidate list for a query.
///
/// Prefers candidates carried over from an earlier turn (the fast path) and
/// falls back to a live retrieval call. Both paths are capped at
/// `fetch_limit` to bound downstream fan-out; retrieval failures degrade to
/// an empty list so the pipeline proceeds to its not-found path instead of
/// aborting.
pub struct CandidateSource {
    retriever: Arc<dyn Retriever>,
    fetch_limit: usize,
}

impl CandidateSource {
    pub fn new(retriever: Arc<dyn Retriever>, fetch_limit: usize) -> Self {
        Self {
            retriever,
            fetch_limit,
        }
    }

    /// Fetch candidates for a request. Never fails; an empty vector means
    /// "no candidates".
    pub async fn fetch(&self, request: &AskRequest) -> Vec<Candidate> {
        if let Some(prior) = &request.prior_candidates {
            if !prior.is_empty() {
                debug!(
                    query_id = %request.query_id,
                    count = prior.len(),
                    "Using fast-path candidates from request"
                );
                let mut candidates = prior.clone();
                candidates.truncate(self.fetch_limit);
                return candidates;
            }
        }

        match self
            .retriever
            .search(&request.item_name, self.fetch_limit, &request.site)
            .await
        {
            Ok(mut candidates) => {
                candidates.truncate(self.fetch_limit);
                debug!(
                    query_id = %request.query_id,
                    count = candidates.len(),
                    "Retrieved candidates"
                );
                candidates
            }
            Err(err) => {
                warn!(
                    query_id = %request.query_id,
                    error = %err,
                    "Candidate retrieval failed, continuing with no candidates"
                );
                Vec::new()
            }
        }
    }
}
