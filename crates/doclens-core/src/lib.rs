//! doclens Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout doclens:
//! - Analysis result models (entities, key phrases, document type)
//! - The provider boundary (parsed documents, classifier output)
//! - Common error types
//! - Shared traits for text engines, classifiers and LLM clients
//! - Configuration management

pub mod config;

pub use config::{
    AnalyzerConfig, AppConfig, ClassifierConfig, ConfigError, EngineConfig, LlmProvider,
    LoggingConfig, DEFAULT_ENTITY_LABELS,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for doclens operations
#[derive(Error, Debug)]
pub enum DoclensError {
    /// A capability provider could not be constructed. The analyzer is unusable.
    #[error("Failed to initialize {provider}: {message}")]
    ProviderInitialization { provider: String, message: String },

    /// A capability provider failed while processing an input.
    #[error("{provider} failed: {message}")]
    ProviderInvocation { provider: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DoclensError {
    /// Shorthand for a [`DoclensError::ProviderInitialization`]
    pub fn initialization(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderInitialization {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`DoclensError::ProviderInvocation`]
    pub fn invocation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderInvocation {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Re-tag an error raised while building a provider as an initialization failure.
    ///
    /// Invocation errors (e.g. a failed probe request) become initialization
    /// errors for the same provider; initialization errors pass through.
    pub fn into_initialization(self, provider: &str) -> Self {
        match self {
            Self::ProviderInitialization { .. } => self,
            Self::ProviderInvocation { provider, message } => {
                Self::ProviderInitialization { provider, message }
            }
            other => Self::initialization(provider, other.to_string()),
        }
    }
}

impl From<ConfigError> for DoclensError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DoclensError>;

// ============================================================================
// Analysis Models
// ============================================================================

/// A named entity found in the analyzed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Surface text, a substring of the input
    pub text: String,

    /// Semantic category (e.g. `ORG`, `GPE`, `DISEASE`)
    pub label: String,
}

impl EntityMention {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// A multi-word noun phrase
pub type KeyPhrase = String;

/// Minimum number of whitespace-separated tokens for a noun chunk to count as a key phrase
pub const MIN_KEY_PHRASE_TOKENS: usize = 2;

/// Whether a noun chunk's surface text qualifies as a key phrase
pub fn is_key_phrase(text: &str) -> bool {
    text.split_whitespace().count() >= MIN_KEY_PHRASE_TOKENS
}

/// Ranked zero-shot classification output
///
/// `labels` and `scores` are co-indexed and ordered by descending score.
/// With multi-label scoring each score is independent, so they need not sum to 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
}

impl ClassificationResult {
    /// Build a ranked result from unordered `(label, score)` pairs.
    ///
    /// Ties keep their input order.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut pairs: Vec<(String, f32)> =
            pairs.into_iter().map(|(l, s)| (l.into(), s)).collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (labels, scores) = pairs.into_iter().unzip();
        Self { labels, scores }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate `(label, score)` pairs in rank order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.scores.iter().copied())
    }

    /// Highest-ranked label and its score
    pub fn top(&self) -> Option<(&str, f32)> {
        self.iter().next()
    }

    /// Score assigned to `label`, if present
    pub fn score_of(&self, label: &str) -> Option<f32> {
        self.iter().find(|(l, _)| *l == label).map(|(_, s)| s)
    }

    /// Scores are non-increasing in label order
    pub fn is_ranked(&self) -> bool {
        self.scores.windows(2).all(|w| w[0] >= w[1])
    }

    /// Check the ranked-output contract against the candidate labels that were requested.
    ///
    /// Requires co-indexed arrays, non-increasing scores and every candidate
    /// present exactly once (and nothing else).
    pub fn validate(&self, candidates: &[&str]) -> Result<()> {
        if self.labels.len() != self.scores.len() {
            return Err(DoclensError::invocation(
                "classifier",
                format!(
                    "{} labels but {} scores",
                    self.labels.len(),
                    self.scores.len()
                ),
            ));
        }

        if !self.is_ranked() {
            return Err(DoclensError::invocation(
                "classifier",
                "scores are not in descending order",
            ));
        }

        if self.labels.len() != candidates.len() {
            return Err(DoclensError::invocation(
                "classifier",
                format!(
                    "expected {} labels, got {}",
                    candidates.len(),
                    self.labels.len()
                ),
            ));
        }

        for candidate in candidates {
            let count = self.labels.iter().filter(|l| l == candidate).count();
            if count != 1 {
                return Err(DoclensError::invocation(
                    "classifier",
                    format!("label '{candidate}' returned {count} times"),
                ));
            }
        }

        Ok(())
    }
}

/// Aggregate output of a single document analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Named entities in left-to-right order
    pub entities: Vec<EntityMention>,

    /// Multi-word noun phrases in left-to-right order
    pub key_phrases: Vec<KeyPhrase>,

    /// Ranked document-type labels
    pub document_type: ClassificationResult,
}

// ============================================================================
// Provider Boundary
// ============================================================================

/// A contiguous noun phrase reported by a text engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounChunk {
    pub text: String,
}

impl NounChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Output of one text-engine pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDoc {
    pub entities: Vec<EntityMention>,
    pub noun_chunks: Vec<NounChunk>,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for text-analysis engines (entities + noun chunks)
#[async_trait::async_trait]
pub trait TextEngine: Send + Sync {
    /// Parse a text in a single pass
    async fn parse(&self, text: &str) -> Result<ParsedDoc>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Trait for zero-shot text classifiers
#[async_trait::async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    /// Score `text` against every candidate label, returning ranked output
    async fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
        multi_label: bool,
    ) -> Result<ClassificationResult>;

    /// Classifier name for logging
    fn name(&self) -> &str;
}

/// Trait for LLM clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check that the backend is reachable and the configured model is available
    async fn verify(&self) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CANDIDATES: [&str; 3] = ["a", "b", "c"];

    #[test]
    fn test_key_phrase_token_count() {
        assert!(is_key_phrase("breast cancer"));
        assert!(is_key_phrase("  Phase 3\tclinical trial "));
        assert!(!is_key_phrase("efficacy"));
        assert!(!is_key_phrase("   "));
        assert!(!is_key_phrase(""));
    }

    #[test]
    fn test_from_pairs_ranks_descending() {
        let result = ClassificationResult::from_pairs(vec![("a", 0.1), ("b", 0.9), ("c", 0.5)]);

        assert_eq!(result.labels, vec!["b", "c", "a"]);
        assert_eq!(result.scores, vec![0.9, 0.5, 0.1]);
        assert!(result.is_ranked());
        assert_eq!(result.top(), Some(("b", 0.9)));
        assert_eq!(result.score_of("c"), Some(0.5));
        assert_eq!(result.score_of("z"), None);
    }

    #[test]
    fn test_from_pairs_keeps_tie_order() {
        let result = ClassificationResult::from_pairs(vec![("x", 0.5), ("y", 0.5), ("z", 0.7)]);
        assert_eq!(result.labels, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_validate_accepts_full_ranking() {
        let result = ClassificationResult::from_pairs(vec![("a", 0.2), ("b", 0.3), ("c", 0.1)]);
        assert!(result.validate(&CANDIDATES).is_ok());
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let result = ClassificationResult {
            labels: vec!["a".into(), "b".into(), "c".into()],
            scores: vec![0.9, 0.1],
        };
        assert!(matches!(
            result.validate(&CANDIDATES),
            Err(DoclensError::ProviderInvocation { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_and_duplicate_labels() {
        let missing = ClassificationResult::from_pairs(vec![("a", 0.2), ("b", 0.3)]);
        assert!(missing.validate(&CANDIDATES).is_err());

        let duplicate = ClassificationResult::from_pairs(vec![("a", 0.2), ("a", 0.3), ("c", 0.1)]);
        assert!(duplicate.validate(&CANDIDATES).is_err());
    }

    #[test]
    fn test_validate_rejects_unranked() {
        let result = ClassificationResult {
            labels: vec!["a".into(), "b".into(), "c".into()],
            scores: vec![0.1, 0.9, 0.5],
        };
        assert!(result.validate(&CANDIDATES).is_err());
    }

    #[test]
    fn test_into_initialization() {
        let err = DoclensError::invocation("classifier", "404").into_initialization("classifier");
        assert!(matches!(
            err,
            DoclensError::ProviderInitialization { ref provider, .. } if provider == "classifier"
        ));

        let err = DoclensError::ConfigError("bad".into()).into_initialization("text engine");
        assert!(err.to_string().contains("text engine"));
    }

    #[test]
    fn test_analysis_result_json_shape() {
        let result = AnalysisResult {
            entities: vec![EntityMention::new("Mayo Clinic", "ORG")],
            key_phrases: vec!["advanced breast cancer patients".to_string()],
            document_type: ClassificationResult::from_pairs(vec![("clinical protocol", 0.97)]),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["entities"][0]["text"], "Mayo Clinic");
        assert_eq!(json["entities"][0]["label"], "ORG");
        assert_eq!(json["key_phrases"][0], "advanced breast cancer patients");
        assert_eq!(json["document_type"]["labels"][0], "clinical protocol");
        assert!(json["document_type"]["scores"][0].is_number());
    }

    proptest! {
        #[test]
        fn prop_from_pairs_is_ranked(scores in proptest::collection::vec(0.0f32..=1.0, 0..16)) {
            let pairs = scores.iter().enumerate().map(|(i, s)| (format!("l{i}"), *s));
            let result = ClassificationResult::from_pairs(pairs);

            prop_assert_eq!(result.labels.len(), result.scores.len());
            prop_assert_eq!(result.len(), scores.len());
            prop_assert!(result.is_ranked());
        }

        #[test]
        fn prop_key_phrase_needs_two_words(
            words in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 0..6),
            sep in "[ \t\n]{1,3}",
        ) {
            let text = words.join(sep.as_str());
            prop_assert_eq!(is_key_phrase(&text), words.len() >= 2);
        }
    }
}
