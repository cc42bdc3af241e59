use super::http_layers::RequestsLoggingLevel;

/// Runtime configuration for the HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
}
