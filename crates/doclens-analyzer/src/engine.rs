//! LLM-backed text-analysis engine
//!
//! Prompts an LLM for named entities and noun chunks, then anchors every
//! returned span in the original text so the output follows a
//! left-to-right scan and never contains text that is not in the input.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::llm::create_llm_client;
use doclens_core::{
    DoclensError, EngineConfig, EntityMention, LlmClient, NounChunk, ParsedDoc, Result,
    TextEngine, DEFAULT_ENTITY_LABELS,
};

const PROVIDER: &str = "text engine";

/// Matches a fenced ```json block wrapped around the object
const FENCE_PATTERN: &str = r"(?s)```(?:json)?\s*(\{.*\})\s*```";

/// Text engine that delegates parsing to an LLM
pub struct LlmTextEngine {
    llm: Box<dyn LlmClient>,
    system_prompt: String,
    entity_labels: Vec<String>,
    fence: Regex,
}

/// JSON shape requested from the LLM
#[derive(Debug, Deserialize)]
struct EngineOutput {
    #[serde(default)]
    entities: Vec<LlmEntity>,
    #[serde(default)]
    noun_chunks: Vec<LlmChunk>,
}

#[derive(Debug, Deserialize)]
struct LlmEntity {
    text: String,
    #[serde(alias = "type", alias = "entity_type")]
    label: String,
}

/// Models sometimes wrap chunks in objects despite the instructions
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LlmChunk {
    Text(String),
    Object { text: String },
}

impl LlmChunk {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Object { text } => text,
        }
    }
}

impl LlmTextEngine {
    /// Create an engine over an existing LLM client with the default entity labels
    pub fn new(llm: Box<dyn LlmClient>) -> Result<Self> {
        let fence = Regex::new(FENCE_PATTERN)
            .map_err(|e| DoclensError::initialization(PROVIDER, e.to_string()))?;

        Ok(Self {
            llm,
            system_prompt: include_str!("prompts/engine_system.txt").to_string(),
            entity_labels: DEFAULT_ENTITY_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fence,
        })
    }

    /// Create from config, building the LLM client it needs
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let llm = create_llm_client(config)?;
        Ok(Self::new(llm)?.with_entity_labels(config.entity_labels.clone()))
    }

    /// Override the entity categories (an empty list keeps the current ones)
    pub fn with_entity_labels(mut self, labels: Vec<String>) -> Self {
        if !labels.is_empty() {
            self.entity_labels = labels;
        }
        self
    }

    /// Check the backing LLM is reachable
    pub async fn verify(&self) -> Result<()> {
        self.llm.verify().await
    }

    /// Build the extraction prompt
    pub fn build_prompt(&self, text: &str) -> String {
        format!(
            "{}\nEntity types: {}\n\nText:\n{}\n\nJSON:",
            self.system_prompt,
            self.entity_labels.join(", "),
            text
        )
    }

    /// Locate the JSON object in a raw LLM response
    fn extract_json<'a>(&self, response: &'a str) -> Option<&'a str> {
        let trimmed = response.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            return Some(trimmed);
        }

        if let Some(caps) = self.fence.captures(trimmed) {
            return caps.get(1).map(|m| m.as_str());
        }

        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        (start < end).then(|| &trimmed[start..=end])
    }

    /// Parse an LLM response into a [`ParsedDoc`] anchored in `original_text`
    pub fn parse_response(&self, response: &str, original_text: &str) -> Result<ParsedDoc> {
        let json = self.extract_json(response).ok_or_else(|| {
            DoclensError::invocation(PROVIDER, "response contains no JSON object")
        })?;

        let output: EngineOutput = serde_json::from_str(json).map_err(|e| {
            DoclensError::invocation(PROVIDER, format!("Failed to parse response: {e}"))
        })?;

        let mut cursors = HashMap::new();
        let mut entities: Vec<(usize, EntityMention)> = Vec::new();
        for entity in output.entities {
            let text = entity.text.trim();
            let label = entity.label.trim().to_uppercase();
            if label.is_empty() {
                continue;
            }
            match anchor(original_text, text, &mut cursors) {
                Some(start) => entities.push((start, EntityMention::new(text, label))),
                None => debug!(text, "dropping entity not found in text"),
            }
        }

        let mut cursors = HashMap::new();
        let mut noun_chunks: Vec<(usize, NounChunk)> = Vec::new();
        for chunk in output.noun_chunks {
            let raw = chunk.into_text();
            let text = raw.trim();
            match anchor(original_text, text, &mut cursors) {
                Some(start) => noun_chunks.push((start, NounChunk::new(text))),
                None => debug!(text, "dropping noun chunk not found in text"),
            }
        }

        entities.sort_by_key(|(start, _)| *start);
        noun_chunks.sort_by_key(|(start, _)| *start);

        Ok(ParsedDoc {
            entities: entities.into_iter().map(|(_, e)| e).collect(),
            noun_chunks: noun_chunks.into_iter().map(|(_, c)| c).collect(),
        })
    }
}

/// Find the next occurrence of `span` in `text`.
///
/// `cursors` remembers where the previous occurrence of each span ended, so a
/// span reported N times maps onto its first N occurrences.
fn anchor(text: &str, span: &str, cursors: &mut HashMap<String, usize>) -> Option<usize> {
    if span.is_empty() {
        return None;
    }

    let from = cursors.get(span).copied().unwrap_or(0);
    let start = text.get(from..)?.find(span)? + from;
    cursors.insert(span.to_string(), start + span.len());
    Some(start)
}

#[async_trait]
impl TextEngine for LlmTextEngine {
    async fn parse(&self, text: &str) -> Result<ParsedDoc> {
        if text.trim().is_empty() {
            return Ok(ParsedDoc::default());
        }

        let prompt = self.build_prompt(text);
        let response = self.llm.generate(&prompt).await?;
        let parsed = self.parse_response(&response, text)?;

        debug!(
            entities = parsed.entities.len(),
            noun_chunks = parsed.noun_chunks.len(),
            "text engine pass complete"
        );

        Ok(parsed)
    }

    fn name(&self) -> &str {
        "llm-text-engine"
    }
}

// ============================================================================
// Tests
// ============================================================================
