//! Port definitions for the inference engine
//!
//! Defines the trait that inference backends implement, plus the
//! provider-neutral request, message, and tool types used by the
//! application layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// A tool the model may call during a completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must be unique within a request)
    pub name: String,
    /// Natural-language description shown to the model
    pub description: String,
    /// JSON schema of the tool arguments
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments as provided by the model
    pub arguments: serde_json::Value,
}

/// The outcome of a tool invocation, fed back to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that produced this result
    pub name: String,
    /// Result payload
    pub content: serde_json::Value,
}

/// One part of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContentPart {
    /// Plain text
    Text(String),
    /// Inline media bytes (image or PDF)
    Media {
        mime_type: String,
        data: Vec<u8>,
    },
    /// A tool call emitted by the model
    ToolCall(ToolCall),
    /// A tool result produced by the caller
    ToolResult(ToolResult),
}

/// A message in a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "user", "model", or "tool"
    pub role: String,
    /// Message parts
    pub parts: Vec<ContentPart>,
}

impl Message {
    /// Create a user message with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    /// Create a user message with text plus inline media
    pub fn user_with_media(
        text: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![
                ContentPart::Text(text.into()),
                ContentPart::Media {
                    mime_type: mime_type.into(),
                    data,
                },
            ],
        }
    }

    /// Create a model message carrying tool calls
    #[must_use]
    pub fn model_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: "model".to_string(),
            parts: calls.into_iter().map(ContentPart::ToolCall).collect(),
        }
    }

    /// Create a tool message carrying tool results
    #[must_use]
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: "tool".to_string(),
            parts: results.into_iter().map(ContentPart::ToolResult).collect(),
        }
    }
}

/// Request for a completion
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Optional system instruction
    pub system: Option<String>,
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Tools offered to the model
    pub tools: Vec<ToolDefinition>,
    /// Model override (config default used when absent)
    pub model: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Maximum tokens override
    pub max_tokens: Option<u32>,
}

impl InferenceRequest {
    /// Create a simple single-turn text request
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Create a single-turn request with inline media
    pub fn with_media(
        prompt: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            system: None,
            messages: vec![Message::user_with_media(prompt, mime_type, data)],
            tools: Vec::new(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Create a request from a full message history
    #[must_use]
    pub fn conversation(messages: Vec<Message>) -> Self {
        Self {
            system: None,
            messages,
            tools: Vec::new(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the system instruction
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Offer tools to the model
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the model for this request
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set temperature
    #[must_use]
    pub const fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Whether any message carries media parts
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.parts.iter().any(|p| matches!(p, ContentPart::Media { .. })))
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion returned by the model
#[derive(Debug, Clone)]
pub struct Completion {
    /// Concatenated text parts
    pub text: String,
    /// Tool calls requested by the model (empty when it answered directly)
    pub tool_calls: Vec<ToolCall>,
    /// Model that produced the completion
    pub model: String,
    /// Token usage, if reported
    pub usage: Option<TokenUsage>,
}

/// Port for inference backends
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Run a completion request
    async fn generate(&self, request: InferenceRequest) -> Result<Completion, InferenceError>;

    /// Check if the inference API is reachable
    async fn health_check(&self) -> Result<bool, InferenceError>;

    /// Get the default text model
    fn default_model(&self) -> &str;
}
