//! PostLens Enrich — pluggable text/image analysis providers and the
//! batch enrichment worker.
//!
//! Providers are capability traits with a required low-cost fallback.
//! When the `onnx` feature is enabled and model files are present,
//! `OnnxTextEnricher` runs transformer sentiment classification; without
//! it, sentiment comes from the keyword fallback. Either way the worker
//! always produces a result.

pub mod image;
pub mod onnx_text;
pub mod text;
pub mod worker;

pub use image::{ImageAnalysis, ImageEnricher, StaticImageEnricher};
pub use text::{KeywordTextEnricher, TextAnalysis, TextEnricher};
pub use worker::EnrichmentWorker;

#[cfg(feature = "onnx")]
pub use onnx_text::OnnxTextEnricher;

use std::path::Path;
use std::sync::Arc;

/// Create the best available text enricher for the given model directory.
///
/// Tries ONNX first (if the feature is enabled and model files are
/// present), falls back to keyword analysis. Called once per process; the
/// returned handle is shared by injection, never re-created per post.
pub fn create_text_enricher(model_dir: &Path) -> Arc<dyn TextEnricher> {
    #[cfg(feature = "onnx")]
    {
        match OnnxTextEnricher::load(model_dir) {
            Ok(enricher) => {
                tracing::info!("Using ONNX sentiment model from {}", model_dir.display());
                return Arc::new(enricher);
            }
            Err(e) => {
                tracing::warn!(
                    "ONNX sentiment model unavailable: {}. Falling back to keyword analysis.",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::info!("ONNX feature disabled. Using keyword text analysis.");
    }

    Arc::new(KeywordTextEnricher)
}

/// Create the best available image enricher.
///
/// Currently always the static fallback; the factory is the seam where a
/// CLIP-class provider would plug in.
pub fn create_image_enricher(_model_dir: &Path) -> Arc<dyn ImageEnricher> {
    Arc::new(StaticImageEnricher)
}
