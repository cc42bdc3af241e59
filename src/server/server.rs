use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::ask::AskPipeline;
use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::ask::make_ask_routes;
use super::metrics::metrics_handler;
use super::state::ServerState;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
    };
    Json(stats)
}

async fn health() -> &'static str {
    "ok"
}

fn make_app(state: ServerState) -> Router {
    let ask_routes = make_ask_routes(state.clone());

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .with_state(state.clone())
        .nest("/v1", ask_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(config: ServerConfig, pipeline: Arc<AskPipeline>) -> Result<()> {
    let state = ServerState::new(config.clone(), pipeline);
    let app = make_app(state);

    // Metrics exposition runs on its own port.
    let metrics_app = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener =
        tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.metrics_port)).await?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            tracing::error!(error = %err, "Metrics server exited");
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    info!("Listening on port {}", config.port);

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(61)), "0d 00:01:01");
        assert_eq!(
            format_uptime(Duration::from_secs(86_400 + 3600 + 60 + 1)),
            "1d 01:01:01"
        );
        assert_eq!(format_uptime(Duration::from_secs(3 * 86_400)), "3d 00:00:00");
    }
}
