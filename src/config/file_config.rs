use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Collaborator configs
    pub retrieval: Option<RetrievalConfig>,
    pub llm: Option<LlmConfig>,

    // Pipeline tuning
    pub query: Option<QueryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Base URL of the vector-search service.
    pub url: Option<String>,
    pub timeout_sec: Option<u64>,
    /// How many candidates to fetch per query.
    pub fetch_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Shell command that outputs the API key (for rotating tokens).
    pub api_key_command: Option<String>,
    /// Model for high-volume scoring calls.
    pub model_low: Option<String>,
    /// Model for extraction calls.
    pub model_high: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct QueryConfig {
    /// Minimum match score (0-100) for a candidate to count as a match.
    pub match_threshold: Option<u8>,
    /// Maximum matched items to extract details for.
    pub max_results: Option<usize>,
    /// Cap on item description length fed to the model, in characters.
    pub max_description_chars: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
