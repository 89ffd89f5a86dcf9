//! Image enrichment capability trait and the static fallback provider.

use postlens_core::Result;

/// Tag lists are capped regardless of provider.
const MAX_TAGS: usize = 10;

/// Result of analyzing one image against its post's text.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub caption: Option<String>,
    pub tags: Vec<String>,
    /// Image/text similarity in [0, 1].
    pub similarity_score: f64,
}

/// Image analysis capability.
///
/// `image` is the media URL or extracted file path; providers decide what
/// they can actually resolve.
pub trait ImageEnricher: Send + Sync {
    fn caption(&self, image: &str) -> Option<String>;

    /// Descriptive tags, at most 10.
    fn tags(&self, image: &str) -> Vec<String>;

    /// Similarity between the image and a text, in [0, 1].
    fn similarity(&self, image: &str, text: &str) -> f64;

    /// Full pipeline over one image. Similarity is only computed when
    /// there is associated text to compare against.
    fn process(&self, image: &str, associated_text: &str) -> Result<ImageAnalysis> {
        let caption = self.caption(image);
        let mut tags = self.tags(image);
        tags.truncate(MAX_TAGS);
        let similarity_score = if associated_text.trim().is_empty() {
            0.0
        } else {
            self.similarity(image, associated_text).clamp(0.0, 1.0)
        };
        Ok(ImageAnalysis {
            caption,
            tags,
            similarity_score,
        })
    }

    /// Short provider name for logs and stats.
    fn name(&self) -> &'static str;
}

/// Zero-dependency fallback: fixed caption and tags, neutral similarity.
/// Keeps the worker productive when no vision model is loaded.
pub struct StaticImageEnricher;

impl ImageEnricher for StaticImageEnricher {
    fn caption(&self, _image: &str) -> Option<String> {
        Some("Image content".to_string())
    }

    fn tags(&self, _image: &str) -> Vec<String> {
        vec!["image".to_string()]
    }

    fn similarity(&self, _image: &str, _text: &str) -> f64 {
        0.5
    }

    fn name(&self) -> &'static str {
        "static-fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_fallback_values() {
        let enricher = StaticImageEnricher;
        let analysis = enricher
            .process("http://x/photo.jpg", "a sunny beach")
            .unwrap();
        assert_eq!(analysis.caption.as_deref(), Some("Image content"));
        assert_eq!(analysis.tags, vec!["image"]);
        assert_eq!(analysis.similarity_score, 0.5);
    }

    #[test]
    fn test_similarity_needs_associated_text() {
        let enricher = StaticImageEnricher;
        let analysis = enricher.process("http://x/photo.jpg", "  ").unwrap();
        assert_eq!(analysis.similarity_score, 0.0);
    }
}
