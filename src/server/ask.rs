//! Query API routes

use crate::ask::{AskRequest, OutboundMessage};
use crate::retrieval::Candidate;

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;

use super::state::ServerState;

/// Detail request used when the client does not specify one.
const DEFAULT_DETAILS_REQUESTED: &str = "a short description of the item";

/// Site scope used when the client does not specify one.
const DEFAULT_SITE: &str = "all";

/// Buffer between the pipeline and the draining response task.
const MESSAGE_BUFFER: usize = 16;

#[derive(Deserialize)]
struct AskBody {
    pub item_name: String,

    pub details_requested: Option<String>,

    pub site: Option<String>,

    /// Candidates carried over from an earlier turn (fast path).
    #[serde(default)]
    pub prior_candidates: Option<Vec<Candidate>>,
}

impl From<AskBody> for AskRequest {
    fn from(body: AskBody) -> Self {
        let mut request = AskRequest::new(
            body.item_name,
            body.details_requested
                .unwrap_or_else(|| DEFAULT_DETAILS_REQUESTED.to_string()),
            body.site.unwrap_or_else(|| DEFAULT_SITE.to_string()),
        );
        if let Some(prior) = body.prior_candidates {
            request = request.with_prior_candidates(prior);
        }
        request
    }
}

/// Spawn the pipeline for a request and hand back the message receiver.
///
/// The sender moves into the spawned task, so the receiver terminates when
/// the pipeline finishes.
fn spawn_pipeline(state: &ServerState, request: AskRequest) -> mpsc::Receiver<OutboundMessage> {
    let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.handle(request, &tx).await;
    });
    rx
}

/// POST /ask - run the full pipeline and return all messages at once.
async fn ask(
    State(state): State<ServerState>,
    Json(body): Json<AskBody>,
) -> impl IntoResponse {
    let mut rx = spawn_pipeline(&state, body.into());

    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }

    Json(messages)
}

#[derive(Deserialize)]
struct AskStreamQuery {
    /// The name of the item the user is asking about
    name: String,
    /// What the user wants to know about it
    details: Option<String>,
    /// Site scope
    site: Option<String>,
}

/// GET /ask/stream - stream messages as SSE events while the pipeline runs.
async fn ask_stream(
    State(state): State<ServerState>,
    Query(params): Query<AskStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let request = AskRequest::new(
        params.name,
        params
            .details
            .unwrap_or_else(|| DEFAULT_DETAILS_REQUESTED.to_string()),
        params.site.unwrap_or_else(|| DEFAULT_SITE.to_string()),
    );

    let rx = spawn_pipeline(&state, request);

    let events = stream::unfold(rx, |mut rx| async move {
        let message = rx.recv().await?;
        let json = serde_json::to_string(&message).unwrap_or_else(|_| "{}".to_string());
        Some((Ok(Event::default().data(json)), rx))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

pub fn make_ask_routes(state: ServerState) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/ask/stream", get(ask_stream))
        .with_state(state)
}
