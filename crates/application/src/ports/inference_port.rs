//! Inference port - Interface for the hosted model
//!
//! Two operations: structured receipt extraction from a document, and
//! tool-calling agent completions for free-form queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// The receipt content handed to the extraction agent
#[derive(Debug, Clone)]
pub enum ReceiptSource {
    /// Binary media (image or PDF) forwarded as-is to the multimodal model
    Media { mime_type: String, data: Vec<u8> },
    /// Plain text content inlined into the prompt
    Text(String),
}

/// Raw fields returned by the extraction agent
///
/// Values arrive as the model produced them; validation into domain types
/// happens in [`crate::receipt_fields`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    pub date: Option<String>,
    pub vendor: Option<String>,
    pub total_amount: Option<serde_json::Value>,
}

/// A tool offered to the query agent
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The result of a tool call, fed back to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub name: String,
    pub content: serde_json::Value,
}

/// One turn of the agent conversation
#[derive(Debug, Clone)]
pub enum AgentTurn {
    /// The user's question
    User(String),
    /// A model turn, possibly requesting tool calls
    Assistant {
        text: String,
        calls: Vec<ToolInvocation>,
    },
    /// Tool results answering the previous assistant turn
    ToolResults(Vec<ToolOutcome>),
}

/// Completion of one agent round
#[derive(Debug, Clone)]
pub struct AgentCompletion {
    /// Text produced this round (may be empty when only tools were called)
    pub text: String,
    /// Tool calls the model wants executed
    pub calls: Vec<ToolInvocation>,
}

/// Port for inference operations
#[async_trait]
pub trait InferencePort: Send + Sync {
    /// Run the extraction agent over a receipt document
    async fn extract_receipt(
        &self,
        source: ReceiptSource,
    ) -> Result<ExtractedReceipt, ApplicationError>;

    /// Run one round of the tool-calling query agent
    async fn complete_agent(
        &self,
        system: &str,
        turns: &[AgentTurn],
        tools: &[ToolSpec],
    ) -> Result<AgentCompletion, ApplicationError>;

    /// Check if the inference backend is healthy
    async fn is_healthy(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn InferencePort) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn InferencePort>();
    }

    #[test]
    fn extracted_receipt_deserializes_number_and_string_amounts() {
        let number: ExtractedReceipt =
            serde_json::from_str(r#"{"total_amount": 12.34}"#).unwrap();
        assert_eq!(number.total_amount, Some(serde_json::json!(12.34)));

        let string: ExtractedReceipt =
            serde_json::from_str(r#"{"total_amount": "12.34"}"#).unwrap();
        assert_eq!(string.total_amount, Some(serde_json::json!("12.34")));
    }

    #[test]
    fn extracted_receipt_defaults_to_empty() {
        let empty: ExtractedReceipt = serde_json::from_str("{}").unwrap();
        assert!(empty.date.is_none());
        assert!(empty.vendor.is_none());
        assert!(empty.total_amount.is_none());
    }
}
