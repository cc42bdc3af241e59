//! The query-to-result pipeline.
//!
//! Orchestrates the stages: candidate acquisition, parallel relevance
//! verification, ranked selection, per-item detail extraction, and
//! incremental emission. Runs exactly once per query; stage failures degrade
//! gracefully and the client always receives at least one message.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::llm::{CompletionOptions, LlmProvider};
use crate::retrieval::Retriever;
use crate::server::metrics;

use super::candidates::{CandidateSource, DEFAULT_FETCH_LIMIT};
use super::describe::DEFAULT_MAX_DESCRIPTION_CHARS;
use super::evaluator::MatchEvaluator;
use super::extraction::DetailExtractor;
use super::messages::OutboundMessage;
use super::request::AskRequest;
use super::selection::SelectionPolicy;

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Cap on candidates fetched per query.
    pub fetch_limit: usize,
    /// Selection policy (threshold + result cap).
    pub selection: SelectionPolicy,
    /// Cap on item description length fed to the model.
    pub max_description_chars: usize,
    /// Options for scoring calls.
    pub scoring: CompletionOptions,
    /// Options for extraction calls.
    pub extraction: CompletionOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fetch_limit: DEFAULT_FETCH_LIMIT,
            selection: SelectionPolicy::default(),
            max_description_chars: DEFAULT_MAX_DESCRIPTION_CHARS,
            scoring: CompletionOptions::default(),
            extraction: CompletionOptions::default(),
        }
    }
}

/// The full query-answering pipeline.
///
/// Cheap to share behind an `Arc`; each `handle` call is an independent
/// invocation with no state carried between queries.
pub struct AskPipeline {
    source: CandidateSource,
    evaluator: MatchEvaluator,
    selection: SelectionPolicy,
    extractor: DetailExtractor,
}

impl AskPipeline {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmProvider>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source: CandidateSource::new(retriever, settings.fetch_limit),
            evaluator: MatchEvaluator::new(
                llm.clone(),
                settings.scoring,
                settings.max_description_chars,
            ),
            selection: settings.selection.clone(),
            extractor: DetailExtractor::new(
                llm,
                settings.extraction,
                settings.max_description_chars,
            ),
        }
    }

    /// Run the full pipeline for one query, emitting results on `tx`.
    ///
    /// Returns only after all emission is complete. Never fails: every
    /// failure path converges on the single not-found terminal message, so
    /// the client receives either item details or exactly one not-found.
    /// Dropping the returned future (caller cancellation) abandons all
    /// in-flight work and suppresses any further emission.
    pub async fn handle(&self, request: AskRequest, tx: &mpsc::Sender<OutboundMessage>) {
        let started = Instant::now();

        if request.item_name.trim().is_empty() {
            warn!(query_id = %request.query_id, "Query carried no item name");
            metrics::record_query("not_found", started.elapsed());
            send(tx, OutboundMessage::not_found(&request.item_name, &request.site)).await;
            return;
        }

        info!(
            query_id = %request.query_id,
            item_name = %request.item_name,
            site = %request.site,
            "Handling query"
        );

        // A panic below this point is a programming error; trap it so the
        // client still gets its terminal message instead of a silent drop.
        match AssertUnwindSafe(self.run(&request, tx)).catch_unwind().await {
            Ok(emitted) => {
                let outcome = if emitted > 0 { "matched" } else { "not_found" };
                metrics::record_query(outcome, started.elapsed());
                info!(
                    query_id = %request.query_id,
                    emitted,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query complete"
                );
            }
            Err(_) => {
                error!(
                    query_id = %request.query_id,
                    "Query pipeline panicked, emitting not-found"
                );
                metrics::record_query("error", started.elapsed());
                send(tx, OutboundMessage::not_found(&request.item_name, &request.site)).await;
            }
        }
    }

    /// The pipeline stages. Returns the number of item-detail messages
    /// emitted; zero means the not-found message was emitted instead.
    async fn run(&self, request: &AskRequest, tx: &mpsc::Sender<OutboundMessage>) -> usize {
        let candidates = self.source.fetch(request).await;
        debug!(
            query_id = %request.query_id,
            candidates = candidates.len(),
            "Candidates fetched"
        );

        let results = self
            .evaluator
            .evaluate_all(&request.query_id, &request.item_name, &candidates)
            .await;

        let matched = self.selection.select(candidates, results);

        if matched.is_empty() {
            info!(
                query_id = %request.query_id,
                item_name = %request.item_name,
                "No items matched above threshold"
            );
            send(tx, OutboundMessage::not_found(&request.item_name, &request.site)).await;
            return 0;
        }

        info!(
            query_id = %request.query_id,
            matched = matched.len(),
            top_score = matched[0].score,
            "Items selected for extraction"
        );

        // Fan out extraction; each success is emitted the moment it
        // completes, in completion order. A failed item contributes nothing
        // and never blocks its siblings.
        let emissions = matched.iter().map(|item| async move {
            match self
                .extractor
                .extract(&request.item_name, &request.details_requested, item)
                .await
            {
                Ok(detail) => {
                    let message = OutboundMessage::item_detail(&request.item_name, detail, item);
                    send(tx, message).await;
                    true
                }
                Err(err) => {
                    warn!(
                        query_id = %request.query_id,
                        item = %item.candidate.url,
                        error = %err,
                        "Extraction failed, dropping item"
                    );
                    false
                }
            }
        });

        let succeeded = join_all(emissions)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();

        // The client contract is "never zero messages": if every extraction
        // failed, fall back to the terminal not-found message.
        if succeeded == 0 {
            warn!(
                query_id = %request.query_id,
                matched = matched.len(),
                "All extractions failed, emitting not-found"
            );
            send(tx, OutboundMessage::not_found(&request.item_name, &request.site)).await;
        }

        succeeded
    }
}

/// Send one message on the client channel. A closed channel means the client
/// went away; that is the transport's concern, not the pipeline's.
async fn send(tx: &mpsc::Sender<OutboundMessage>, message: OutboundMessage) -> bool {
    if tx.send(message).await.is_err() {
        debug!("Client channel closed, dropping message");
        false
    } else {
        true
    }
}
