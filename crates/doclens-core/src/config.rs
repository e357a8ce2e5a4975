//! doclens Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for local development (Ollama + hosted inference).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Text-analysis engine (entities + noun chunks)
    pub engine: EngineConfig,

    /// Zero-shot document classifier
    pub classifier: ClassifierConfig,

    /// Analyzer behaviour
    pub analyzer: AnalyzerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Apply every recognised environment variable on top of the current values
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        // Engine
        if let Some(provider) = var("LLM_PROVIDER") {
            self.engine.provider = provider.parse()?;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.engine.openai_api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.engine.openai_base_url = Some(url);
        }
        if let Some(url) = var("OLLAMA_URL") {
            self.engine.ollama_url = url;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.engine.model = model;
        }

        // Classifier
        if let Some(token) = var("HF_API_TOKEN") {
            self.classifier.api_token = Some(token);
        }
        if let Some(model) = var("ZERO_SHOT_MODEL") {
            self.classifier.model = model;
        }
        if let Some(url) = var("HF_INFERENCE_URL") {
            self.classifier.inference_url = url;
        }

        // Analyzer
        if let Some(verify) = var("DOCLENS_VERIFY_PROVIDERS") {
            self.analyzer.verify_providers = parse_bool("DOCLENS_VERIFY_PROVIDERS", &verify)?;
        }

        // Logging
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.json_format = match format.to_lowercase().as_str() {
                "json" => true,
                "text" | "pretty" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "LOG_FORMAT".to_string(),
                        value: format,
                    })
                }
            };
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Text-analysis engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// LLM provider backing the engine
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Entity categories the engine is asked to recognise
    pub entity_labels: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            timeout_secs: 120,
            entity_labels: DEFAULT_ENTITY_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// OntoNotes categories plus the biomedical ones clinical documents need
pub const DEFAULT_ENTITY_LABELS: &[&str] = &[
    "PERSON",
    "NORP",
    "FAC",
    "ORG",
    "GPE",
    "LOC",
    "PRODUCT",
    "EVENT",
    "WORK_OF_ART",
    "LAW",
    "LANGUAGE",
    "DATE",
    "TIME",
    "PERCENT",
    "MONEY",
    "QUANTITY",
    "ORDINAL",
    "CARDINAL",
    "DISEASE",
    "DRUG",
];

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Ollama,
    Azure,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "azure" => Ok(Self::Azure),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
            Self::Azure => write!(f, "azure"),
        }
    }
}

/// Zero-shot classifier configuration (Hugging Face Inference API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Model repository id
    pub model: String,

    /// Base URL for inference requests; the model id is appended
    pub inference_url: String,

    /// Base URL of the model hub metadata API; the model id is appended
    pub hub_url: String,

    /// Hugging Face access token
    pub api_token: Option<String>,

    /// Hypothesis template, e.g. "This document is a {}."
    pub hypothesis_template: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "facebook/bart-large-mnli".to_string(),
            inference_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            hub_url: "https://huggingface.co/api/models".to_string(),
            api_token: None,
            hypothesis_template: None,
            timeout_secs: 60,
        }
    }
}

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Probe both providers while building the analyzer
    pub verify_providers: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            verify_providers: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
