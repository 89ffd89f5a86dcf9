//! Background enrichment queue — consumes upload batches asynchronously.

use std::sync::Arc;

use tracing::{error, info};

use crate::state::{AppState, EnrichmentJob};
use postlens_core::UploadStatus;
use postlens_enrich::EnrichmentWorker;

/// Start the background enrichment worker task.
pub fn start_enrichment_worker(state: Arc<AppState>) {
    let mut rx = match state.take_enrich_rx() {
        Some(rx) => rx,
        None => {
            error!("Enrichment worker already started");
            return;
        }
    };

    // Re-enqueue batches whose posts never got enriched in prior sessions.
    let catchup_state = state.clone();
    tokio::spawn(async move {
        tokio::task::spawn_blocking(move || requeue_unenriched(&catchup_state))
            .await
            .ok();
    });

    tokio::spawn(async move {
        info!("Background enrichment worker started");
        while let Some(job) = rx.recv().await {
            process_job(&state, job);
        }
    });
}

fn process_job(state: &AppState, job: EnrichmentJob) {
    let worker = EnrichmentWorker::new(
        &state.store,
        state.text_enricher.clone(),
        state.image_enricher.clone(),
    );

    match worker.enrich_batch(&job.file_id, &job.posts) {
        Ok(processed) => {
            info!(
                "Batch {} finished: {}/{} posts enriched",
                job.file_id,
                processed,
                job.posts.len()
            );
        }
        Err(e) => {
            // Batch-level failure: reported, not retried. Re-submitting the
            // same file id is safe because per-post updates are idempotent.
            error!("Batch {} failed: {}", job.file_id, e);
            let _ = state.store.set_upload_status(
                &job.file_id,
                UploadStatus::Error,
                Some(&e.to_string()),
            );
        }
    }
}

/// Startup catch-up: any batch with un-enriched posts goes back on the queue.
fn requeue_unenriched(state: &AppState) {
    let file_ids = match state.store.unenriched_file_ids() {
        Ok(ids) => ids,
        Err(e) => {
            error!("Failed to scan for un-enriched batches: {}", e);
            return;
        }
    };

    for file_id in file_ids {
        match state.store.get_posts_for_file(&file_id) {
            Ok(posts) => {
                info!("Re-queueing batch {} with {} posts", file_id, posts.len());
                state.enqueue_enrichment(file_id, posts);
            }
            Err(e) => error!("Failed to load posts for batch {}: {}", file_id, e),
        }
    }
}
