//! ONNX-based sentiment provider.
//!
//! Loads a sequence-classification model (e.g. a distilled BERT sentiment
//! head exported to ONNX) and its HuggingFace tokenizer. Cleaning, language
//! and entity handling stay with the keyword fallback; only sentiment is
//! model-backed, and any inference failure degrades to the fallback answer
//! so enrichment always produces a result. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::{info, warn};

    use crate::text::{KeywordTextEnricher, TextEnricher};
    use postlens_core::Sentiment;

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 512;

    /// ONNX sentiment classifier with keyword fallback for everything else.
    pub struct OnnxTextEnricher {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        fallback: KeywordTextEnricher,
    }

    impl OnnxTextEnricher {
        /// Load a sentiment model and tokenizer from the given directory.
        ///
        /// Expects:
        /// - `model_dir/sentiment.onnx` — the classification model
        /// - `model_dir/tokenizer.json` — the HuggingFace tokenizer
        pub fn load(model_dir: &Path) -> Result<Self, String> {
            let model_path = model_dir.join("sentiment.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(format!("Model not found: {}", model_path.display()));
            }
            if !tokenizer_path.exists() {
                return Err(format!("Tokenizer not found: {}", tokenizer_path.display()));
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| format!("Failed to create session builder: {}", e))?
                .with_intra_threads(2)
                .map_err(|e| format!("Failed to set threads: {}", e))?
                .commit_from_file(&model_path)
                .map_err(|e| format!("Failed to load ONNX model: {}", e))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| format!("Failed to load tokenizer: {}", e))?;

            info!("ONNX sentiment model loaded: {}", model_path.display());

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                fallback: KeywordTextEnricher,
            })
        }

        /// Run classification. None on any failure; the caller falls back.
        fn classify(&self, text: &str) -> Option<(Sentiment, f64)> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| {
                    warn!("Tokenization failed: {}", e);
                    e
                })
                .ok()?;

            let input_ids = encoding.get_ids();
            let attention_mask = encoding.get_attention_mask();

            let seq_len = input_ids.len().min(MAX_SEQ_LEN);
            let ids_data: Vec<i64> = input_ids[..seq_len].iter().map(|&id| id as i64).collect();
            let mask_data: Vec<i64> = attention_mask[..seq_len].iter().map(|&m| m as i64).collect();

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids_data))
                .map_err(|e| warn!("Failed to create ids tensor: {}", e))
                .ok()?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask_data))
                .map_err(|e| warn!("Failed to create mask tensor: {}", e))
                .ok()?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor])
                .map_err(|e| {
                    warn!("ONNX inference failed: {}", e);
                    e
                })
                .ok()?;

            // Logits come back as [1, num_labels]: two labels in SST-2
            // order (negative, positive) or three (negative, neutral,
            // positive).
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    warn!("Failed to extract logits: {}", e);
                    e
                })
                .ok()?;

            let shape_dims: Vec<i64> = shape.iter().copied().collect();
            if shape_dims.len() != 2 {
                warn!("Unexpected output shape: {:?}", shape_dims);
                return None;
            }
            let num_labels = shape_dims[1] as usize;
            let probs = softmax(&data[..num_labels]);
            let (best, confidence) = probs
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, &p)| (i, p as f64))?;

            let sentiment = match (num_labels, best) {
                (2, 0) | (3, 0) => Sentiment::Negative,
                (2, 1) | (3, 2) => Sentiment::Positive,
                (3, 1) => Sentiment::Neutral,
                _ => {
                    warn!("Unexpected label count: {}", num_labels);
                    return None;
                }
            };
            Some((sentiment, confidence))
        }
    }

    impl TextEnricher for OnnxTextEnricher {
        fn clean(&self, text: &str) -> String {
            self.fallback.clean(text)
        }

        fn detect_language(&self, text: &str) -> Option<String> {
            self.fallback.detect_language(text)
        }

        fn extract_entities(&self, text: &str) -> Vec<String> {
            self.fallback.extract_entities(text)
        }

        fn analyze_sentiment(&self, text: &str) -> (Sentiment, f64) {
            if text.trim().is_empty() {
                return (Sentiment::Neutral, 0.0);
            }
            self.classify(text)
                .unwrap_or_else(|| self.fallback.analyze_sentiment(text))
        }

        fn name(&self) -> &'static str {
            "onnx-sentiment"
        }
    }

    fn softmax(logits: &[f32]) -> Vec<f32> {
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        exps.iter().map(|&e| e / sum).collect()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_softmax_sums_to_one() {
            let probs = softmax(&[1.0, 2.0, 3.0]);
            let sum: f32 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
            assert!(probs[2] > probs[1] && probs[1] > probs[0]);
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxTextEnricher;
