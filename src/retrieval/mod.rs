//! Retrieval capability seam.
//!
//! The pipeline treats candidate retrieval as an external capability behind
//! the [`Retriever`] trait. The shipped implementation talks to an HTTP
//! vector-search service; [`NoOpRetriever`] stands in when no backend is
//! configured and in tests.

mod http;

pub use http::HttpRetriever;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A retrieved item considered for matching against the user's query,
/// before verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifier of the item (URL or key).
    pub url: String,
    /// The item's structured payload as serialized JSON.
    pub schema_json: String,
    /// Display name of the item.
    pub name: String,
    /// Site or collection the item belongs to.
    pub site: String,
}

/// Errors that can occur when fetching candidates.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Backend error (status {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait for candidate retrieval backends.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve up to `top_k` candidates for `query`, scoped to `site`.
    ///
    /// The returned order is the backend's relevance order and is preserved
    /// through the pipeline for tie-breaking.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        site: &str,
    ) -> Result<Vec<Candidate>, RetrievalError>;
}

/// A retriever that never returns candidates.
pub struct NoOpRetriever;

#[async_trait]
impl Retriever for NoOpRetriever {
    async fn search(
        &self,
        _query: &str,
        _top_k: usize,
        _site: &str,
    ) -> Result<Vec<Candidate>, RetrievalError> {
        Ok(Vec::new())
    }
}
