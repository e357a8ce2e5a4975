//! Analyzer integration tests
//!
//! The LLM-backed engine runs against a scripted LLM so the whole
//! parse → anchor → filter → classify path is exercised offline.
//!
//! Tests marked with #[ignore] call the real providers configured through
//! the environment (LLM_PROVIDER, OLLAMA_URL, HF_API_TOKEN, ...).
//! To run them: cargo test -p doclens-analyzer -- --ignored

use async_trait::async_trait;
use doclens_analyzer::{DocumentAnalyzer, LlmTextEngine, DOCUMENT_TYPE_LABELS};
use doclens_core::{
    AppConfig, ClassificationResult, DoclensError, LlmClient, Result, ZeroShotClassifier,
};

const SAMPLE: &str = "
    This Phase 3 clinical trial aims to evaluate the efficacy of Drug X
    in treating advanced breast cancer patients. The study will be conducted
    at Mayo Clinic and Johns Hopkins Hospital.
    ";

/// What a well-behaved model answers for `SAMPLE`
const SAMPLE_RESPONSE: &str = r#"```json
{
  "entities": [
    {"text": "Mayo Clinic", "label": "ORG"},
    {"text": "Phase 3", "label": "CARDINAL"},
    {"text": "Johns Hopkins Hospital", "label": "ORG"},
    {"text": "breast cancer", "label": "DISEASE"}
  ],
  "noun_chunks": [
    "This Phase 3 clinical trial",
    "the efficacy",
    "Drug X",
    "advanced breast cancer patients",
    "The study",
    "Mayo Clinic",
    "Johns Hopkins Hospital",
    "patients"
  ]
}
```"#;

struct ScriptedLlm(&'static str);

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }

    async fn verify(&self) -> Result<()> {
        Ok(())
    }
}

/// Ranks "clinical protocol" first when the text mentions a trial
struct KeywordClassifier;

#[async_trait]
impl ZeroShotClassifier for KeywordClassifier {
    async fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
        _multi_label: bool,
    ) -> Result<ClassificationResult> {
        let trial = text.contains("trial");
        Ok(ClassificationResult::from_pairs(candidate_labels.iter().map(
            |label| {
                let score = match *label {
                    "clinical protocol" if trial => 0.97,
                    "scientific publication" if trial => 0.55,
                    _ => 0.05,
                };
                (*label, score)
            },
        )))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

fn scripted_analyzer(response: &'static str) -> DocumentAnalyzer {
    let engine = LlmTextEngine::new(Box::new(ScriptedLlm(response))).unwrap();
    DocumentAnalyzer::new(Box::new(engine), Box::new(KeywordClassifier))
}

#[tokio::test]
async fn test_clinical_trial_sample() {
    let analyzer = scripted_analyzer(SAMPLE_RESPONSE);
    let result = analyzer.analyze(SAMPLE).await.unwrap();

    let entities: Vec<(&str, &str)> = result
        .entities
        .iter()
        .map(|e| (e.text.as_str(), e.label.as_str()))
        .collect();
    assert_eq!(
        entities,
        vec![
            ("Phase 3", "CARDINAL"),
            ("breast cancer", "DISEASE"),
            ("Mayo Clinic", "ORG"),
            ("Johns Hopkins Hospital", "ORG"),
        ]
    );
    assert!(result
        .entities
        .iter()
        .any(|e| e.text.to_lowercase().contains("breast cancer")));

    assert!(result.key_phrases.iter().all(|p| p.split_whitespace().count() >= 2));
    assert!(result
        .key_phrases
        .contains(&"advanced breast cancer patients".to_string()));
    assert!(!result.key_phrases.contains(&"patients".to_string()));

    assert_eq!(result.document_type.top().map(|(l, _)| l), Some("clinical protocol"));
    assert!(result.document_type.is_ranked());
}

#[tokio::test]
async fn test_empty_input_still_classifies() {
    let analyzer = scripted_analyzer("not even json");
    let result = analyzer.analyze("").await.unwrap();

    assert!(result.entities.is_empty());
    assert!(result.key_phrases.is_empty());
    assert_eq!(result.document_type.labels.len(), DOCUMENT_TYPE_LABELS.len());
    assert_eq!(result.document_type.scores.len(), DOCUMENT_TYPE_LABELS.len());
}

#[tokio::test]
async fn test_malformed_engine_output_fails_call() {
    let analyzer = scripted_analyzer("Sorry, I can't do that.");
    let err = analyzer.analyze(SAMPLE).await.unwrap_err();
    assert!(matches!(err, DoclensError::ProviderInvocation { .. }));
}

#[tokio::test]
async fn test_result_serializes_to_three_keys() {
    let analyzer = scripted_analyzer(SAMPLE_RESPONSE);
    let result = analyzer.analyze(SAMPLE).await.unwrap();

    let json = serde_json::to_value(&result).unwrap();
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 3);
    assert!(json["entities"].is_array());
    assert!(json["key_phrases"].is_array());
    assert!(json["document_type"]["labels"].is_array());
    assert!(json["document_type"]["scores"].is_array());
}

#[tokio::test]
async fn test_unreachable_providers_fail_construction() {
    let mut config = AppConfig::default();
    config.engine.ollama_url = "http://127.0.0.1:9".to_string();
    config.engine.timeout_secs = 2;
    config.analyzer.verify_providers = true;

    let err = DocumentAnalyzer::from_config(&config).await.err().unwrap();
    assert!(matches!(err, DoclensError::ProviderInitialization { .. }));
}

#[tokio::test]
async fn test_construction_without_verification() {
    let mut config = AppConfig::default();
    config.analyzer.verify_providers = false;

    let analyzer = DocumentAnalyzer::from_config(&config).await.unwrap();
    assert_eq!(analyzer.candidate_labels(), &DOCUMENT_TYPE_LABELS);
}

#[tokio::test]
#[ignore = "requires live LLM and Hugging Face inference providers"]
async fn test_live_clinical_trial_sample() {
    let config = AppConfig::from_env().unwrap();
    let analyzer = DocumentAnalyzer::from_config(&config).await.unwrap();

    let result = analyzer.analyze(SAMPLE).await.unwrap();

    assert!(result.entities.iter().any(|e| {
        e.text.to_lowercase().contains("breast cancer") || e.text.contains("Mayo Clinic")
    }));
    assert!(result
        .document_type
        .labels
        .iter()
        .any(|l| l == "clinical protocol"));
    for label in DOCUMENT_TYPE_LABELS {
        assert_eq!(
            result.document_type.labels.iter().filter(|l| *l == label).count(),
            1
        );
    }
    assert!(result.document_type.is_ranked());
}
