//! doclens Analyzer - Document analysis orchestration
//!
//! Combines a text-analysis engine and a zero-shot classifier to extract
//! named entities, multi-word key phrases and a ranked document type
//! from a piece of text.
//!
//! Both providers are acquired once and reused for every call. The
//! bundled providers only hold an immutable HTTP client, so one
//! [`DocumentAnalyzer`] can be shared across tasks (e.g. behind an `Arc`).

pub mod classifier;
pub mod engine;
pub mod llm;

pub use classifier::HfZeroShotClassifier;
pub use engine::LlmTextEngine;
pub use llm::{create_llm_client, OllamaClient, OpenAiClient};

use doclens_core::{
    is_key_phrase, AnalysisResult, AppConfig, EntityMention, KeyPhrase, ParsedDoc, Result,
    TextEngine, ZeroShotClassifier,
};
use tracing::{debug, info, instrument};

/// Candidate document types, in the order they are sent to the classifier
pub const DOCUMENT_TYPE_LABELS: [&str; 5] = [
    "clinical protocol",
    "regulatory document",
    "scientific publication",
    "patient data",
    "business report",
];

/// Extracts entities, key phrases and document type from text
pub struct DocumentAnalyzer {
    engine: Box<dyn TextEngine>,
    classifier: Box<dyn ZeroShotClassifier>,
}

impl DocumentAnalyzer {
    /// Create an analyzer over already-constructed providers
    pub fn new(engine: Box<dyn TextEngine>, classifier: Box<dyn ZeroShotClassifier>) -> Self {
        Self { engine, classifier }
    }

    /// Build both providers from config.
    ///
    /// When `analyzer.verify_providers` is set, each provider is probed
    /// before the analyzer is returned. Any failure is reported as
    /// `ProviderInitialization`.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let engine = LlmTextEngine::from_config(&config.engine)
            .map_err(|e| e.into_initialization("text engine"))?;
        let classifier = HfZeroShotClassifier::from_config(&config.classifier)
            .map_err(|e| e.into_initialization("classifier"))?;

        if config.analyzer.verify_providers {
            engine
                .verify()
                .await
                .map_err(|e| e.into_initialization("text engine"))?;
            classifier
                .verify()
                .await
                .map_err(|e| e.into_initialization("classifier"))?;
        }

        info!(
            engine = %config.engine.provider,
            engine_model = %config.engine.model,
            classifier_model = %config.classifier.model,
            verified = config.analyzer.verify_providers,
            "document analyzer ready"
        );

        Ok(Self::new(Box::new(engine), Box::new(classifier)))
    }

    /// The fixed document-type candidates
    pub fn candidate_labels(&self) -> &'static [&'static str] {
        &DOCUMENT_TYPE_LABELS
    }

    /// Analyze a text.
    ///
    /// Runs the engine once, then the classifier on the original text.
    /// Any provider failure fails the whole call; no partial result is returned.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub async fn analyze(&self, text: &str) -> Result<AnalysisResult> {
        let doc = self.engine.parse(text).await?;
        debug!(engine = self.engine.name(), "parsed document");

        let entities = extract_entities(&doc);
        let key_phrases = extract_key_phrases(&doc);

        let document_type = self
            .classifier
            .classify(text, &DOCUMENT_TYPE_LABELS, true)
            .await?;
        document_type.validate(&DOCUMENT_TYPE_LABELS)?;
        debug!(
            classifier = self.classifier.name(),
            top = ?document_type.top(),
            "classified document"
        );

        Ok(AnalysisResult {
            entities,
            key_phrases,
            document_type,
        })
    }
}

/// Entity mentions in engine order
fn extract_entities(doc: &ParsedDoc) -> Vec<EntityMention> {
    doc.entities
        .iter()
        .map(|ent| EntityMention::new(ent.text.clone(), ent.label.clone()))
        .collect()
}

/// Noun chunks with at least two whitespace-separated tokens
fn extract_key_phrases(doc: &ParsedDoc) -> Vec<KeyPhrase> {
    doc.noun_chunks
        .iter()
        .filter(|chunk| is_key_phrase(&chunk.text))
        .map(|chunk| chunk.text.clone())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
