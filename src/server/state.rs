use axum::extract::FromRef;

use crate::ask::AskPipeline;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type SharedPipeline = Arc<AskPipeline>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub pipeline: SharedPipeline,
}

impl ServerState {
    pub fn new(config: ServerConfig, pipeline: SharedPipeline) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            pipeline,
        }
    }
}

impl FromRef<ServerState> for SharedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
