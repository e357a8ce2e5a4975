//! LLM Client implementations
//!
//! Provides abstraction for OpenAI-compatible and Ollama completion APIs.
//! These back the [`LlmTextEngine`](crate::engine::LlmTextEngine).

use std::time::Duration;

use async_trait::async_trait;
use doclens_core::{DoclensError, EngineConfig, LlmClient, LlmProvider, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "text engine";

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DoclensError::initialization(PROVIDER, format!("HTTP client: {e}")))
}

// ============================================================================
// OpenAI Client
// ============================================================================

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    json_output: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Choice {
    message: Message,
    finish_reason: Option<String>,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
            json_output: false,
        }
    }

    /// Create from config
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| DoclensError::initialization(PROVIDER, "OpenAI API key required"))?;

        let base_url = config
            .openai_base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            api_key: api_key.clone(),
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            json_output: false,
        })
    }

    /// Set custom base URL (for Azure or compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Ask the API to constrain output to a JSON object
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: self.json_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "OpenAI completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DoclensError::invocation(PROVIDER, format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DoclensError::invocation(
                PROVIDER,
                format!("OpenAI error: {error_text}"),
            ));
        }

        let result: OpenAiResponse = response.json().await.map_err(|e| {
            DoclensError::invocation(PROVIDER, format!("Failed to parse response: {e}"))
        })?;

        result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| DoclensError::invocation(PROVIDER, "No response generated"))
    }

    async fn verify(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                DoclensError::initialization(PROVIDER, format!("OpenAI unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(DoclensError::initialization(
                PROVIDER,
                format!(
                    "model '{}' unavailable (HTTP {})",
                    self.model,
                    response.status()
                ),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    json_output: bool,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.0,
            json_output: false,
        }
    }

    /// Create from config
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            json_output: false,
        })
    }

    /// Ask Ollama to constrain output to JSON
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Whether `name` from `/api/tags` refers to the configured model.
    ///
    /// A model configured without a tag matches its `:latest` variant.
    fn is_configured_model(&self, name: &str) -> bool {
        name == self.model
            || (!self.model.contains(':') && name == format!("{}:latest", self.model))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: self.json_output.then_some("json"),
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Ollama generate request");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                DoclensError::invocation(PROVIDER, format!("Ollama request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DoclensError::invocation(
                PROVIDER,
                format!("Ollama error: {error_text}"),
            ));
        }

        let result: OllamaResponse = response.json().await.map_err(|e| {
            DoclensError::invocation(PROVIDER, format!("Failed to parse Ollama response: {e}"))
        })?;

        Ok(result.response)
    }

    async fn verify(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| {
                DoclensError::initialization(PROVIDER, format!("Ollama unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(DoclensError::initialization(
                PROVIDER,
                format!("Ollama returned HTTP {}", response.status()),
            ));
        }

        let tags: OllamaTags = response.json().await.map_err(|e| {
            DoclensError::initialization(PROVIDER, format!("Failed to parse Ollama tags: {e}"))
        })?;

        if tags.models.iter().any(|m| self.is_configured_model(&m.name)) {
            Ok(())
        } else {
            Err(DoclensError::initialization(
                PROVIDER,
                format!(
                    "model '{}' is not pulled (try `ollama pull {}`)",
                    self.model, self.model
                ),
            ))
        }
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create a JSON-mode LLM client from config
pub fn create_llm_client(config: &EngineConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider {
        LlmProvider::OpenAI | LlmProvider::Azure => {
            Ok(Box::new(OpenAiClient::from_config(config)?.with_json_output()))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_config(config)?.with_json_output())),
    }
}

// ============================================================================
// Tests
// ============================================================================
