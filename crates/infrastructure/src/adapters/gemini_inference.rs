//! Gemini inference adapter
//!
//! Implements the application `InferencePort` over the ai_core engine:
//! builds the extraction prompt, parses the extraction JSON, and maps the
//! agent turn/tool types onto the engine's wire types.

use std::sync::Arc;

use ai_core::{
    ContentPart, InferenceEngine, InferenceRequest, Message, ToolCall, ToolDefinition, ToolResult,
    extraction_prompt, parse_extraction,
};
use application::{
    error::ApplicationError,
    ports::{
        AgentCompletion, AgentTurn, ExtractedReceipt, InferencePort, ReceiptSource,
        ToolInvocation, ToolOutcome, ToolSpec,
    },
};
use async_trait::async_trait;
use tracing::instrument;

/// Inference port implementation backed by the Gemini engine
pub struct GeminiInferenceAdapter {
    engine: Arc<dyn InferenceEngine>,
}

impl std::fmt::Debug for GeminiInferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiInferenceAdapter")
            .finish_non_exhaustive()
    }
}

impl GeminiInferenceAdapter {
    /// Create a new inference adapter
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self { engine }
    }
}

/// Map an agent turn onto wire messages
fn turn_to_message(turn: &AgentTurn) -> Message {
    match turn {
        AgentTurn::User(text) => Message::user(text.clone()),
        AgentTurn::Assistant { text, calls } => {
            let mut parts = Vec::new();
            if !text.is_empty() {
                parts.push(ContentPart::Text(text.clone()));
            }
            parts.extend(calls.iter().map(|call| {
                ContentPart::ToolCall(ToolCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                })
            }));
            Message {
                role: "model".to_string(),
                parts,
            }
        },
        AgentTurn::ToolResults(results) => Message::tool_results(
            results
                .iter()
                .map(|outcome| ToolResult {
                    name: outcome.name.clone(),
                    content: outcome.content.clone(),
                })
                .collect(),
        ),
    }
}

#[async_trait]
impl InferencePort for GeminiInferenceAdapter {
    #[instrument(skip(self, source))]
    async fn extract_receipt(
        &self,
        source: ReceiptSource,
    ) -> Result<ExtractedReceipt, ApplicationError> {
        let request = match source {
            ReceiptSource::Media { mime_type, data } => {
                InferenceRequest::with_media(extraction_prompt(""), mime_type, data)
            },
            ReceiptSource::Text(content) => InferenceRequest::text(extraction_prompt(&content)),
        };

        let completion = self
            .engine
            .generate(request)
            .await
            .map_err(|e| ApplicationError::Inference(e.to_string()))?;

        let fields = parse_extraction(&completion.text)
            .map_err(|e| ApplicationError::Inference(e.to_string()))?;

        Ok(ExtractedReceipt {
            date: fields.date,
            vendor: fields.vendor,
            total_amount: fields.total_amount,
        })
    }

    #[instrument(skip(self, system, turns, tools), fields(turns = turns.len()))]
    async fn complete_agent(
        &self,
        system: &str,
        turns: &[AgentTurn],
        tools: &[ToolSpec],
    ) -> Result<AgentCompletion, ApplicationError> {
        let messages = turns.iter().map(turn_to_message).collect();
        let tool_definitions = tools
            .iter()
            .map(|spec| ToolDefinition {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            })
            .collect();

        let request = InferenceRequest::conversation(messages)
            .with_system(system)
            .with_tools(tool_definitions);

        let completion = self
            .engine
            .generate(request)
            .await
            .map_err(|e| ApplicationError::Inference(e.to_string()))?;

        Ok(AgentCompletion {
            text: completion.text,
            calls: completion
                .tool_calls
                .into_iter()
                .map(|call| ToolInvocation {
                    name: call.name,
                    arguments: call.arguments,
                })
                .collect(),
        })
    }

    async fn is_healthy(&self) -> bool {
        self.engine.health_check().await.unwrap_or(false)
    }
}
