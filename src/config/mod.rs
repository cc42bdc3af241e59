mod file_config;

pub use file_config::{FileConfig, LlmConfig, QueryConfig, RetrievalConfig};

use crate::ask::{
    PipelineSettings, SelectionPolicy, DEFAULT_FETCH_LIMIT, DEFAULT_MATCH_THRESHOLD,
    DEFAULT_MAX_RESULTS,
};
use crate::llm::CompletionOptions;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub retrieval_url: Option<String>,
    pub retrieval_timeout_sec: u64,
    pub fetch_limit: usize,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub model_low: String,
    pub model_high: String,
    pub match_threshold: u8,
    pub max_results: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::default(),
            retrieval_url: None,
            retrieval_timeout_sec: 30,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            model_low: "gpt-4o-mini".to_string(),
            model_high: "gpt-4o".to_string(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Collaborators
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,

    // Pipeline tuning
    pub query: QuerySettings,
}

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// None means no retrieval backend; only fast-path candidates match.
    pub url: Option<String>,
    pub timeout_sec: u64,
    pub fetch_limit: usize,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub model_low: String,
    pub model_high: String,
    pub temperature: f32,
    pub timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub match_threshold: u8,
    pub max_results: usize,
    pub max_description_chars: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        if port == metrics_port {
            bail!("port and metrics_port must differ (both set to {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let retrieval_file = file.retrieval.unwrap_or_default();
        let retrieval = RetrievalSettings {
            url: retrieval_file.url.or_else(|| cli.retrieval_url.clone()),
            timeout_sec: retrieval_file.timeout_sec.unwrap_or(cli.retrieval_timeout_sec),
            fetch_limit: retrieval_file.fetch_limit.unwrap_or(cli.fetch_limit),
        };

        if retrieval.fetch_limit == 0 {
            bail!("retrieval fetch_limit must be at least 1");
        }

        let llm_file = file.llm.unwrap_or_default();
        let llm = LlmSettings {
            base_url: llm_file.base_url.unwrap_or_else(|| cli.llm_base_url.clone()),
            api_key: llm_file.api_key.or_else(|| cli.llm_api_key.clone()),
            api_key_command: llm_file.api_key_command,
            model_low: llm_file.model_low.unwrap_or_else(|| cli.model_low.clone()),
            model_high: llm_file.model_high.unwrap_or_else(|| cli.model_high.clone()),
            temperature: llm_file.temperature.unwrap_or(0.0),
            timeout_sec: llm_file.timeout_sec.unwrap_or(30),
        };

        if llm.api_key.is_some() && llm.api_key_command.is_some() {
            bail!("api_key and api_key_command cannot both be set");
        }

        let query_file = file.query.unwrap_or_default();
        let query = QuerySettings {
            match_threshold: query_file.match_threshold.unwrap_or(cli.match_threshold),
            max_results: query_file.max_results.unwrap_or(cli.max_results),
            max_description_chars: query_file
                .max_description_chars
                .unwrap_or(crate::ask::PipelineSettings::default().max_description_chars),
        };

        if query.match_threshold > 100 {
            bail!(
                "match_threshold must be between 0 and 100, got {}",
                query.match_threshold
            );
        }
        if query.max_results == 0 {
            bail!("max_results must be at least 1");
        }

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            retrieval,
            llm,
            query,
        })
    }

    /// The server-facing slice of this configuration.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
        }
    }

    /// The pipeline-facing slice of this configuration.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let options = CompletionOptions {
            temperature: self.llm.temperature,
            max_tokens: Some(512),
            timeout: Duration::from_secs(self.llm.timeout_sec),
        };

        PipelineSettings {
            fetch_limit: self.retrieval.fetch_limit,
            selection: SelectionPolicy::new(self.query.match_threshold, self.query.max_results),
            max_description_chars: self.query.max_description_chars,
            scoring: options.clone(),
            extraction: options,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("path"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        // Invalid
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let cli = CliConfig {
            port: 3005,
            metrics_port: 9095,
            logging_level: RequestsLoggingLevel::Headers,
            retrieval_url: Some("http://localhost:8080".to_string()),
            retrieval_timeout_sec: 60,
            fetch_limit: 10,
            llm_api_key: Some("sk-test".to_string()),
            match_threshold: 80,
            max_results: 3,
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.port, 3005);
        assert_eq!(config.metrics_port, 9095);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(
            config.retrieval.url,
            Some("http://localhost:8080".to_string())
        );
        assert_eq!(config.retrieval.timeout_sec, 60);
        assert_eq!(config.retrieval.fetch_limit, 10);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.api_key, Some("sk-test".to_string()));
        assert_eq!(config.query.match_threshold, 80);
        assert_eq!(config.query.max_results, 3);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            port: 3001,
            match_threshold: 70,
            ..Default::default()
        };

        let file_config: FileConfig = toml::from_str(
            r#"
            port = 4000
            logging_level = "none"

            [retrieval]
            url = "http://search:8080"
            fetch_limit = 15

            [llm]
            model_low = "small-model"

            [query]
            match_threshold = 85
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::None);
        assert_eq!(config.retrieval.url, Some("http://search:8080".to_string()));
        assert_eq!(config.retrieval.fetch_limit, 15);
        assert_eq!(config.llm.model_low, "small-model");
        assert_eq!(config.query.match_threshold, 85);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.llm.model_high, "gpt-4o");
        assert_eq!(config.query.max_results, 5);
    }

    #[test]
    fn test_resolve_threshold_out_of_range_error() {
        let cli = CliConfig {
            match_threshold: 101,
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("match_threshold must be between"));
    }

    #[test]
    fn test_resolve_equal_ports_error() {
        let cli = CliConfig {
            port: 9091,
            metrics_port: 9091,
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_resolve_zero_max_results_error() {
        let cli = CliConfig {
            max_results: 0,
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_api_key_conflict_error() {
        let cli = CliConfig {
            llm_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let file_config: FileConfig = toml::from_str(
            r#"
            [llm]
            api_key_command = "pass show openai"
            "#,
        )
        .unwrap();

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot both be set"));
    }

    #[test]
    fn test_file_config_load_missing_file() {
        let result = FileConfig::load(std::path::Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config file"));
    }

    #[test]
    fn test_file_config_load_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 5000\n\n[query]\nmax_results = 2\n"
        )
        .unwrap();

        let file_config = FileConfig::load(file.path()).unwrap();
        assert_eq!(file_config.port, Some(5000));
        assert_eq!(file_config.query.unwrap().max_results, Some(2));
    }

    #[test]
    fn test_file_config_load_invalid_toml() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = [not toml").unwrap();

        let result = FileConfig::load(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[test]
    fn test_pipeline_settings_mapping() {
        let cli = CliConfig {
            fetch_limit: 12,
            match_threshold: 75,
            max_results: 4,
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        let settings = config.pipeline_settings();

        assert_eq!(settings.fetch_limit, 12);
        assert_eq!(settings.selection.threshold, 75);
        assert_eq!(settings.selection.max_results, 4);
        assert_eq!(settings.scoring.timeout, Duration::from_secs(30));
    }
}
