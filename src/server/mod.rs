mod ask;
pub mod config;
mod http_layers;
pub mod metrics;
mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::{log_requests, RequestsLoggingLevel};
pub use server::run_server;
