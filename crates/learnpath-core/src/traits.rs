//! Collaborator traits: text generation and resource lookup.
//!
//! Implemented in `learnpath-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{LearningResource, ResourceType};

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// A backend that turns a prompt into text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text from a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List models this provider is known to serve.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gemini-1.5-pro-latest").
    pub model: String,
    /// The instruction text.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response text, possibly fenced in Markdown.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

// ---------------------------------------------------------------------------
// Resource lookup trait
// ---------------------------------------------------------------------------

/// Finds a learning resource for a topic.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when nothing suitable exists.
    async fn find(
        &self,
        topic: &str,
        resource_type: ResourceType,
    ) -> anyhow::Result<Option<LearningResource>>;
}

// ---------------------------------------------------------------------------
// Default system prompt
// ---------------------------------------------------------------------------

/// Default system prompt for JSON-producing generation calls.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a learning-path assistant. Respond ONLY with a single valid JSON object matching the requested shape. Do not include explanations or markdown formatting.";

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Pull the JSON document out of a model response.
///
/// Handles:
/// - A ```json``` block (preferred over any other block)
/// - A generic ``` block
/// - A truncated, unclosed fence
/// - Raw text with no fences (returned trimmed)
pub fn extract_json_from_response(response: &str) -> String {
    let mut json_blocks = Vec::new();
    let mut generic_blocks = Vec::new();
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();

            // Single-line fence: ```json {"a": 1}```
            let rest = trimmed.trim_start_matches('`').trim_start();
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            if let Some(body) = rest.strip_suffix("```") {
                in_block = false;
                let body = body.trim();
                if !body.is_empty() {
                    json_blocks.push(body.to_string());
                }
            }
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_blocks.push(current_block.clone());
            } else if is_generic_block {
                generic_blocks.push(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    if in_block && !current_block.is_empty() {
        if is_json_block {
            json_blocks.push(current_block);
        } else if is_generic_block {
            generic_blocks.push(current_block);
        }
    }

    if let Some(block) = json_blocks.into_iter().next() {
        return block.trim().to_string();
    }
    if let Some(block) = generic_blocks.into_iter().next() {
        return block.trim().to_string();
    }

    response.trim().to_string()
}
