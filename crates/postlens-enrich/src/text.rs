//! Text enrichment capability trait and the keyword fallback provider.

use once_cell::sync::Lazy;
use regex::Regex;

use postlens_core::{Result, Sentiment};

/// Result of running the full text pipeline over one post's text.
#[derive(Debug, Clone)]
pub struct TextAnalysis {
    pub cleaned_text: String,
    pub language: Option<String>,
    /// Deduplicated entity spans.
    pub entities: Vec<String>,
    pub sentiment: Sentiment,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

/// Text analysis capability.
///
/// `process` is the composed pipeline the worker calls; the fine-grained
/// methods exist so heavy providers can override just the pieces a model
/// covers. Deterministic for a given input and implementation, which is
/// what makes re-enrichment idempotent.
pub trait TextEnricher: Send + Sync {
    /// Strip URLs, @mentions and `#` symbols (keeping the hashtag word),
    /// drop emoji-range code points, collapse whitespace.
    fn clean(&self, text: &str) -> String;

    /// Language code, or None when undetectable.
    fn detect_language(&self, text: &str) -> Option<String>;

    /// Named-entity spans, deduplicated.
    fn extract_entities(&self, text: &str) -> Vec<String>;

    /// Sentiment label and confidence in [0, 1].
    fn analyze_sentiment(&self, text: &str) -> (Sentiment, f64);

    /// Full pipeline: clean, then analyze the cleaned text.
    fn process(&self, text: &str) -> Result<TextAnalysis> {
        let cleaned = self.clean(text);
        let language = self.detect_language(&cleaned);
        let entities = self.extract_entities(&cleaned);
        let (sentiment, confidence) = self.analyze_sentiment(&cleaned);
        Ok(TextAnalysis {
            cleaned_text: cleaned,
            language,
            entities,
            sentiment,
            confidence,
        })
    }

    /// Short provider name for logs and stats.
    fn name(&self) -> &'static str;
}

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").unwrap());
static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
// Emoticons, pictographs, transport symbols, flags, dingbats.
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "[\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\u{1F1E0}-\u{1F1FF}\u{2702}-\u{27B0}]+",
    )
    .unwrap()
});

const POSITIVE_WORDS: [&str; 6] = ["good", "great", "awesome", "love", "happy", "excellent"];
const NEGATIVE_WORDS: [&str; 6] = ["bad", "terrible", "hate", "awful", "sad", "disappointing"];

/// Zero-dependency fallback provider: regex cleaning, keyword-list
/// sentiment, no entity extraction.
pub struct KeywordTextEnricher;

impl TextEnricher for KeywordTextEnricher {
    fn clean(&self, text: &str) -> String {
        let text = URL_RE.replace_all(text, "");
        let text = MENTION_RE.replace_all(&text, "");
        let text = HASHTAG_RE.replace_all(&text, "$1");
        let text = EMOJI_RE.replace_all(&text, "");
        WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
    }

    fn detect_language(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            None
        } else {
            Some("en".to_string())
        }
    }

    fn extract_entities(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }

    fn analyze_sentiment(&self, text: &str) -> (Sentiment, f64) {
        if text.trim().is_empty() {
            return (Sentiment::Neutral, 0.0);
        }

        let lower = text.to_lowercase();
        let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
        let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

        if positive > negative {
            (Sentiment::Positive, 0.7)
        } else if negative > positive {
            (Sentiment::Negative, 0.7)
        } else {
            (Sentiment::Neutral, 0.5)
        }
    }

    fn name(&self) -> &'static str {
        "keyword-fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_urls_mentions_and_hashtag_symbols() {
        let enricher = KeywordTextEnricher;
        let cleaned = enricher.clean("Check https://example.com/x @alice #rustlang   now");
        assert_eq!(cleaned, "Check rustlang now");
    }

    #[test]
    fn test_clean_strips_emoji() {
        let enricher = KeywordTextEnricher;
        assert_eq!(enricher.clean("great day \u{1F600}\u{1F680}"), "great day");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let enricher = KeywordTextEnricher;
        let once = enricher.clean("Loving it! https://t.co/abc #sun @bob \u{1F31E}");
        assert_eq!(enricher.clean(&once), once);
    }

    #[test]
    fn test_sentiment_keyword_counts() {
        let enricher = KeywordTextEnricher;
        assert_eq!(
            enricher.analyze_sentiment("what a great and awesome day"),
            (Sentiment::Positive, 0.7)
        );
        assert_eq!(
            enricher.analyze_sentiment("terrible, I hate it"),
            (Sentiment::Negative, 0.7)
        );
        assert_eq!(
            enricher.analyze_sentiment("the sky is blue"),
            (Sentiment::Neutral, 0.5)
        );
        assert_eq!(enricher.analyze_sentiment("  "), (Sentiment::Neutral, 0.0));
    }

    #[test]
    fn test_process_composes_on_cleaned_text() {
        let enricher = KeywordTextEnricher;
        let analysis = enricher
            .process("I love this #great day! https://t.co/x")
            .unwrap();
        assert_eq!(analysis.cleaned_text, "I love this great day!");
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert_eq!(analysis.language.as_deref(), Some("en"));
        assert!(analysis.entities.is_empty());
    }

    #[test]
    fn test_process_is_deterministic() {
        let enricher = KeywordTextEnricher;
        let a = enricher.process("Same input #every time").unwrap();
        let b = enricher.process("Same input #every time").unwrap();
        assert_eq!(a.cleaned_text, b.cleaned_text);
        assert_eq!(a.language, b.language);
        assert_eq!(a.sentiment, b.sentiment);
        assert_eq!(a.confidence, b.confidence);
    }
}
