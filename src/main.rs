use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sitequery_server::ask::AskPipeline;
use sitequery_server::config::{AppConfig, CliConfig, FileConfig};
use sitequery_server::llm::{LlmProvider, OpenAiProvider};
use sitequery_server::retrieval::{HttpRetriever, NoOpRetriever, Retriever};
use sitequery_server::server::{run_server, RequestsLoggingLevel};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// URL of the vector-search service supplying candidates.
    #[clap(long)]
    pub retrieval_url: Option<String>,

    /// Timeout in seconds for retrieval requests.
    #[clap(long, default_value_t = 30)]
    pub retrieval_timeout_sec: u64,

    /// How many candidates to fetch per query.
    #[clap(long, default_value_t = 20)]
    pub fetch_limit: usize,

    /// Base URL of an OpenAI-compatible model API.
    #[clap(long, default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    /// API key for the model API. Prefer the config file for secrets.
    #[clap(long)]
    pub llm_api_key: Option<String>,

    /// Model used for high-volume candidate scoring.
    #[clap(long, default_value = "gpt-4o-mini")]
    pub model_low: String,

    /// Model used for per-item detail extraction.
    #[clap(long, default_value = "gpt-4o")]
    pub model_high: String,

    /// Minimum match score (0-100) for a candidate to count as a match.
    #[clap(long, default_value_t = 70)]
    pub match_threshold: u8,

    /// Maximum matched items to extract details for.
    #[clap(long, default_value_t = 5)]
    pub max_results: usize,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            retrieval_url: args.retrieval_url.clone(),
            retrieval_timeout_sec: args.retrieval_timeout_sec,
            fetch_limit: args.fetch_limit,
            llm_base_url: args.llm_base_url.clone(),
            llm_api_key: args.llm_api_key.clone(),
            model_low: args.model_low.clone(),
            model_high: args.model_high.clone(),
            match_threshold: args.match_threshold,
            max_results: args.max_results,
        }
    }
}

fn make_llm(config: &AppConfig) -> Arc<dyn LlmProvider> {
    let llm = &config.llm;
    match &llm.api_key_command {
        Some(command) => Arc::new(OpenAiProvider::with_key_command(
            llm.base_url.clone(),
            llm.model_low.clone(),
            llm.model_high.clone(),
            command.clone(),
        )),
        None => Arc::new(OpenAiProvider::new(
            llm.base_url.clone(),
            llm.model_low.clone(),
            llm.model_high.clone(),
            llm.api_key.clone(),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Initializing metrics...");
    sitequery_server::server::metrics::init_metrics();

    let retriever: Arc<dyn Retriever> = match &config.retrieval.url {
        Some(url) => {
            info!("Retrieval backend configured at {}", url);
            let retriever = HttpRetriever::new(url.clone(), config.retrieval.timeout_sec);
            if let Err(err) = retriever.health_check().await {
                warn!(error = %err, "Retrieval backend health check failed at startup");
            }
            Arc::new(retriever)
        }
        None => {
            warn!("No retrieval backend configured; only fast-path candidates will match");
            Arc::new(NoOpRetriever)
        }
    };

    let llm = make_llm(&config);
    info!(
        provider = llm.name(),
        model_low = llm.model(sitequery_server::llm::ModelTier::Low),
        model_high = llm.model(sitequery_server::llm::ModelTier::High),
        "Model provider configured"
    );
    if let Err(err) = llm.health_check().await {
        warn!(error = %err, "Model provider health check failed at startup");
    }

    let pipeline = Arc::new(AskPipeline::new(
        retriever,
        llm,
        config.pipeline_settings(),
    ));

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(config.server_config(), pipeline).await
}
