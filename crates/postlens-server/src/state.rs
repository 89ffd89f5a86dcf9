//! Shared application state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::error;

use postlens_core::{Post, PostLensConfig};
use postlens_enrich::{ImageEnricher, TextEnricher};
use postlens_store::PostStore;

/// Immutable job message published by the upload path and consumed by the
/// background enrichment worker. The posts are a snapshot taken at upload
/// time; nothing else is shared between the two paths.
pub struct EnrichmentJob {
    pub file_id: String,
    pub posts: Vec<Post>,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: PostLensConfig,
    pub store: PostStore,
    pub text_enricher: Arc<dyn TextEnricher>,
    pub image_enricher: Arc<dyn ImageEnricher>,
    pub enrich_tx: mpsc::UnboundedSender<EnrichmentJob>,
    enrich_rx: Mutex<Option<mpsc::UnboundedReceiver<EnrichmentJob>>>,
}

impl AppState {
    pub fn new(
        config: PostLensConfig,
        store: PostStore,
        text_enricher: Arc<dyn TextEnricher>,
        image_enricher: Arc<dyn ImageEnricher>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            config,
            store,
            text_enricher,
            image_enricher,
            enrich_tx: tx,
            enrich_rx: Mutex::new(Some(rx)),
        }
    }

    /// Take the enrichment receiver (can only be called once, by the worker).
    pub fn take_enrich_rx(&self) -> Option<mpsc::UnboundedReceiver<EnrichmentJob>> {
        self.enrich_rx.lock().take()
    }

    /// Publish an enrichment job. The upload path never waits on the result;
    /// a send failure just means the batch stays un-enriched until resubmitted.
    pub fn enqueue_enrichment(&self, file_id: String, posts: Vec<Post>) {
        if self
            .enrich_tx
            .send(EnrichmentJob { file_id, posts })
            .is_err()
        {
            error!("Enrichment worker is not running; batch left un-enriched");
        }
    }
}
