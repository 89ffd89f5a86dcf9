//! Batch enrichment worker.
//!
//! Consumes one `(file_id, posts)` job at a time, out of band from the
//! upload path. Posts are processed independently: one failure is logged
//! and skipped without touching the others, and each post is persisted in
//! a single upsert so readers never see partial field writes. Re-running a
//! batch is safe — same inputs and providers give the same outputs.

use std::sync::Arc;

use tracing::{info, warn};

use crate::image::ImageEnricher;
use crate::text::TextEnricher;
use postlens_core::{Post, Result, UploadStatus};
use postlens_store::PostStore;

/// Applies text and image enrichment to batches of posts.
pub struct EnrichmentWorker<'a> {
    store: &'a PostStore,
    text: Arc<dyn TextEnricher>,
    image: Arc<dyn ImageEnricher>,
}

impl<'a> EnrichmentWorker<'a> {
    pub fn new(
        store: &'a PostStore,
        text: Arc<dyn TextEnricher>,
        image: Arc<dyn ImageEnricher>,
    ) -> Self {
        Self { store, text, image }
    }

    /// Enrich every post of a batch. Returns the number of posts that were
    /// enriched and persisted; failures only lower that count.
    pub fn enrich_batch(&self, file_id: &str, posts: &[Post]) -> Result<usize> {
        if posts.is_empty() {
            self.store
                .set_upload_status(file_id, UploadStatus::Completed, None)?;
            return Ok(0);
        }

        self.store
            .set_upload_status(file_id, UploadStatus::Processing, None)?;

        let mut processed = 0usize;
        for post in posts {
            match self.enrich_post(post) {
                Ok(enriched) => match self.store.upsert_post(file_id, &enriched) {
                    Ok(()) => processed += 1,
                    Err(e) => warn!("Failed to persist enriched post {}: {}", post.post_id, e),
                },
                Err(e) => warn!("Enrichment failed for post {}: {}", post.post_id, e),
            }
        }

        info!(
            "Enriched {}/{} posts for batch {} (text={}, image={})",
            processed,
            posts.len(),
            file_id,
            self.text.name(),
            self.image.name()
        );

        self.store
            .set_upload_status(file_id, UploadStatus::Completed, None)?;
        Ok(processed)
    }

    /// Enrich one post. The returned copy carries every derived field; the
    /// caller persists it in a single upsert, so a failure here leaves the
    /// stored post untouched.
    fn enrich_post(&self, post: &Post) -> Result<Post> {
        let mut post = post.clone();

        let analysis = self.text.process(&post.raw_text)?;
        post.cleaned_text = Some(analysis.cleaned_text);
        post.language = analysis.language;
        post.entities = analysis.entities;
        post.sentiment = Some(analysis.sentiment);
        post.sentiment_confidence = Some(analysis.confidence.clamp(0.0, 1.0));

        let associated = post
            .cleaned_text
            .clone()
            .unwrap_or_else(|| post.raw_text.clone());
        for item in &mut post.media {
            if !item.is_image() {
                continue;
            }
            let target = if item.url.is_empty() {
                item.filename.clone()
            } else {
                item.url.clone()
            };
            let analysis = self.image.process(&target, &associated)?;
            item.caption = analysis.caption;
            item.tags = analysis.tags;
            item.similarity_score = Some(analysis.similarity_score);
        }

        Ok(post)
    }
}
