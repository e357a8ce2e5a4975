//! Zero-shot classification via the Hugging Face Inference API
//!
//! Scores a text against arbitrary candidate labels with an NLI model
//! (`facebook/bart-large-mnli` by default).

use std::time::Duration;

use async_trait::async_trait;
use doclens_core::{
    ClassificationResult, ClassifierConfig, DoclensError, Result, ZeroShotClassifier,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "classifier";

/// Pipeline tag the hub reports for models usable here
const ZERO_SHOT_TASK: &str = "zero-shot-classification";

/// Hugging Face zero-shot classification client
pub struct HfZeroShotClassifier {
    client: Client,
    inference_url: String,
    hub_url: String,
    model: String,
    api_token: Option<String>,
    hypothesis_template: Option<String>,
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    multi_label: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    hypothesis_template: Option<&'a str>,
}

/// The API has answered in two shapes over time
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns {
        labels: Vec<String>,
        scores: Vec<f32>,
    },
    Pairs(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct HubModelInfo {
    pipeline_tag: Option<String>,
}

impl ZeroShotResponse {
    /// Convert to a ranked [`ClassificationResult`]
    fn into_result(self) -> Result<ClassificationResult> {
        match self {
            Self::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(DoclensError::invocation(
                        PROVIDER,
                        format!("{} labels but {} scores", labels.len(), scores.len()),
                    ));
                }
                Ok(ClassificationResult::from_pairs(labels.into_iter().zip(scores)))
            }
            Self::Pairs(pairs) => Ok(ClassificationResult::from_pairs(
                pairs.into_iter().map(|p| (p.label, p.score)),
            )),
        }
    }
}

impl HfZeroShotClassifier {
    /// Create a new classifier for `model` against the public endpoints
    pub fn new(model: impl Into<String>) -> Self {
        let defaults = ClassifierConfig::default();
        Self {
            client: Client::new(),
            inference_url: defaults.inference_url,
            hub_url: defaults.hub_url,
            model: model.into(),
            api_token: None,
            hypothesis_template: None,
        }
    }

    /// Create from config
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(DoclensError::initialization(PROVIDER, "model id is empty"));
        }

        if let Some(template) = &config.hypothesis_template {
            if !template.contains("{}") {
                return Err(DoclensError::initialization(
                    PROVIDER,
                    format!("hypothesis template '{template}' has no {{}} placeholder"),
                ));
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DoclensError::initialization(PROVIDER, format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            inference_url: config.inference_url.trim_end_matches('/').to_string(),
            hub_url: config.hub_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
            hypothesis_template: config.hypothesis_template.clone(),
        })
    }

    /// Set the access token
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check the model exists on the hub and is a zero-shot classifier
    pub async fn verify(&self) -> Result<()> {
        let response = self
            .authorized(self.client.get(format!("{}/{}", self.hub_url, self.model)))
            .send()
            .await
            .map_err(|e| DoclensError::initialization(PROVIDER, format!("hub unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(DoclensError::initialization(
                PROVIDER,
                format!(
                    "model '{}' not found on hub (HTTP {})",
                    self.model,
                    response.status()
                ),
            ));
        }

        let info: HubModelInfo = response.json().await.map_err(|e| {
            DoclensError::initialization(PROVIDER, format!("Failed to parse model info: {e}"))
        })?;

        check_pipeline_tag(&self.model, info.pipeline_tag.as_deref())
    }
}

/// Models without a tag are accepted; a different task is not
fn check_pipeline_tag(model: &str, tag: Option<&str>) -> Result<()> {
    match tag {
        Some(tag) if tag != ZERO_SHOT_TASK => Err(DoclensError::initialization(
            PROVIDER,
            format!("model '{model}' is a {tag} model, not {ZERO_SHOT_TASK}"),
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl ZeroShotClassifier for HfZeroShotClassifier {
    async fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
        multi_label: bool,
    ) -> Result<ClassificationResult> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels,
                multi_label,
                hypothesis_template: self.hypothesis_template.as_deref(),
            },
        };

        debug!(
            model = %self.model,
            text_len = text.len(),
            labels = candidate_labels.len(),
            multi_label,
            "zero-shot classification request"
        );

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/{}", self.inference_url, self.model)),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| DoclensError::invocation(PROVIDER, format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DoclensError::invocation(
                PROVIDER,
                format!("Inference API error (HTTP {status}): {error_text}"),
            ));
        }

        let result: ZeroShotResponse = response.json().await.map_err(|e| {
            DoclensError::invocation(PROVIDER, format!("Failed to parse response: {e}"))
        })?;

        result.into_result()
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
