//! Outbound message types for query results.
//!
//! Messages are the only externally visible artifact of a query invocation.
//! They are emitted progressively over the client channel, allowing results
//! to be displayed as extractions complete.

use serde::Serialize;
use serde_json::Value;

use super::selection::MatchedItem;

/// A message delivered to the client channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// The requested detail for one matched item.
    ItemDetail {
        item_name: String,
        detail: String,
        score: u8,
        explanation: String,
        url: String,
        site: String,
        schema_object: Value,
    },

    /// No item matched the query on the given site. Always the sole message
    /// of its invocation.
    NotFound {
        item_name: String,
        site: String,
        score: u8,
        detail: String,
    },
}

impl OutboundMessage {
    /// Build the detail message for a matched item.
    pub fn item_detail(item_name: &str, detail: String, item: &MatchedItem) -> Self {
        Self::ItemDetail {
            item_name: item_name.to_string(),
            detail,
            score: item.score,
            explanation: item.explanation.clone(),
            url: item.candidate.url.clone(),
            site: item.candidate.site.clone(),
            schema_object: item.schema_object.clone(),
        }
    }

    /// Build the terminal not-found message.
    pub fn not_found(item_name: &str, site: &str) -> Self {
        Self::NotFound {
            item_name: item_name.to_string(),
            site: site.to_string(),
            score: 0,
            detail: String::new(),
        }
    }
}
