//! Sitequery Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod ask;
pub mod config;
pub mod llm;
pub mod retrieval;
pub mod server;

// Re-export commonly used types for convenience
pub use ask::{AskPipeline, AskRequest, OutboundMessage, PipelineSettings};
pub use llm::{LlmProvider, OpenAiProvider};
pub use retrieval::{Candidate, HttpRetriever, NoOpRetriever, Retriever};
pub use server::{run_server, RequestsLoggingLevel};
