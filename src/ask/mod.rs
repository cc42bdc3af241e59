//! Query answering pipeline.
//!
//! Answers a natural-language query against a site's structured-data corpus:
//! fetch candidate items, verify in parallel which ones actually match what
//! the user asked, rank and select, extract the requested detail from each
//! selected item, and deliver results incrementally over a channel.

mod candidates;
mod describe;
mod evaluator;
mod extraction;
mod messages;
mod parse;
mod pipeline;
mod request;
mod selection;

pub use candidates::{CandidateSource, DEFAULT_FETCH_LIMIT};
pub use evaluator::{MatchEvaluator, MatchResult};
pub use extraction::{DetailExtractor, ExtractionError};
pub use messages::OutboundMessage;
pub use pipeline::{AskPipeline, PipelineSettings};
pub use request::AskRequest;
pub use selection::{
    MatchedItem, SelectionPolicy, DEFAULT_MATCH_THRESHOLD, DEFAULT_MAX_RESULTS,
};
