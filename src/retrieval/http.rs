//! HTTP client for the external vector-search service.

use super::{Candidate, RetrievalError, Retriever};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for a vector-search backend.
///
/// The backend returns rows as `[url, schema_json, name, site]` arrays; each
/// row is validated into a typed [`Candidate`] here, at the boundary.
/// Malformed rows are dropped with a warning rather than surfacing inside the
/// scoring loop.
pub struct HttpRetriever {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
    site: &'a str,
}

impl HttpRetriever {
    /// Create a new retriever client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the search service (e.g., "http://localhost:8080")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Self { client, base_url }
    }

    /// Check if the search service is healthy.
    pub async fn health_check(&self) -> Result<(), RetrievalError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RetrievalError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RetrievalError::Backend {
                status: response.status().as_u16(),
                message: "Health check failed".to_string(),
            })
        }
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        site: &str,
    ) -> Result<Vec<Candidate>, RetrievalError> {
        let url = format!("{}/search", self.base_url);
        let request = SearchRequest { query, top_k, site };

        debug!(query = %query, top_k, site = %site, "Searching retrieval backend");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrievalError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Backend {
                status: status.as_u16(),
                message: body,
            });
        }

        let rows: Vec<Value> = response.json().await.map_err(|e| {
            RetrievalError::InvalidResponse(format!("Failed to parse search response: {}", e))
        })?;

        let candidates = parse_candidate_rows(&rows);
        debug!(
            returned = rows.len(),
            valid = candidates.len(),
            "Retrieval backend responded"
        );

        Ok(candidates)
    }
}

/// Validate raw result rows into typed candidates, dropping malformed rows.
///
/// A valid row is a 4-element array of strings `[url, schema_json, name,
/// site]` whose second element parses as JSON.
fn parse_candidate_rows(rows: &[Value]) -> Vec<Candidate> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| match parse_candidate_row(row) {
            Some(candidate) => Some(candidate),
            None => {
                warn!(row = i, "Dropping malformed candidate row from retrieval backend");
                None
            }
        })
        .collect()
}

fn parse_candidate_row(row: &Value) -> Option<Candidate> {
    let fields = row.as_array()?;
    if fields.len() != 4 {
        return None;
    }

    let url = fields[0].as_str()?;
    let schema_json = fields[1].as_str()?;
    let name = fields[2].as_str()?;
    let site = fields[3].as_str()?;

    // The payload must be valid JSON; downstream stages rely on it parsing.
    if serde_json::from_str::<Value>(schema_json).is_err() {
        return None;
    }

    Some(Candidate {
        url: url.to_string(),
        schema_json: schema_json.to_string(),
        name: name.to_string(),
        site: site.to_string(),
    })
}
