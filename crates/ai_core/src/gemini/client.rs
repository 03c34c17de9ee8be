//! Gemini generateContent client

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::InferenceConfig;
use crate::error::InferenceError;
use crate::ports::{
    Completion, ContentPart, InferenceEngine, InferenceRequest, TokenUsage, ToolCall,
};

/// Inference engine backed by the Gemini generateContent API
pub struct GeminiInferenceEngine {
    client: Client,
    config: InferenceConfig,
}

impl std::fmt::Debug for GeminiInferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiInferenceEngine")
            .field("base_url", &self.config.base_url)
            .field("text_model", &self.config.text_model)
            .field("vision_model", &self.config.vision_model)
            .finish_non_exhaustive()
    }
}

impl GeminiInferenceEngine {
    /// Create a new Gemini inference engine
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        if config.api_key.is_empty() {
            return Err(InferenceError::ConnectionFailed(
                "api_key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            text_model = %config.text_model,
            vision_model = %config.vision_model,
            "Initialized Gemini inference engine"
        );

        Ok(Self { client, config })
    }

    /// Pick the model for a request: explicit override, then vision model for
    /// media requests, then the text default
    fn resolve_model<'a>(&'a self, request: &'a InferenceRequest) -> &'a str {
        if let Some(model) = request.model.as_deref() {
            return model;
        }
        if request.has_media() {
            &self.config.vision_model
        } else {
            &self.config.text_model
        }
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.config.base_url, model)
    }
}

/// Wire-format content part
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "inline_data")]
    inline_data: Option<WireInlineData>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "function_call")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "function_response")]
    function_response: Option<WireFunctionResponse>,
}

impl WirePart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDeclarations {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireFunctionDeclarations>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    usage_metadata: Option<WireUsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Convert a port message into a wire content entry
fn to_wire_content(message: &crate::ports::Message) -> WireContent {
    // The API expects tool results inside a user turn
    let role = match message.role.as_str() {
        "model" => "model",
        _ => "user",
    };

    let parts = message
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => WirePart::text(text.clone()),
            ContentPart::Media { mime_type, data } => WirePart {
                text: None,
                inline_data: Some(WireInlineData {
                    mime_type: mime_type.clone(),
                    data: BASE64.encode(data),
                }),
                function_call: None,
                function_response: None,
            },
            ContentPart::ToolCall(call) => WirePart {
                text: None,
                inline_data: None,
                function_call: Some(WireFunctionCall {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                }),
                function_response: None,
            },
            ContentPart::ToolResult(result) => WirePart {
                text: None,
                inline_data: None,
                function_call: None,
                function_response: Some(WireFunctionResponse {
                    name: result.name.clone(),
                    response: result.content.clone(),
                }),
            },
        })
        .collect();

    WireContent {
        role: Some(role.to_string()),
        parts,
    }
}

#[async_trait]
impl InferenceEngine for GeminiInferenceEngine {
    #[instrument(skip(self, request), fields(model = %self.resolve_model(&request), tools = request.tools.len()))]
    async fn generate(&self, request: InferenceRequest) -> Result<Completion, InferenceError> {
        let model = self.resolve_model(&request).to_string();

        let wire_request = GenerateContentRequest {
            system_instruction: request.system.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart::text(text.clone())],
            }),
            contents: request.messages.iter().map(to_wire_content).collect(),
            tools: if request.tools.is_empty() {
                Vec::new()
            } else {
                vec![WireFunctionDeclarations {
                    function_declarations: request
                        .tools
                        .iter()
                        .map(|t| WireFunctionDeclaration {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        })
                        .collect(),
                }]
            },
            generation_config: WireGenerationConfig {
                temperature: request.temperature.unwrap_or(self.config.temperature),
                max_output_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            },
        };

        debug!("Sending generateContent request");

        let response = self
            .client
            .post(self.generate_url(&model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&wire_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            return Err(match status.as_u16() {
                404 => InferenceError::ModelNotAvailable(model),
                429 => InferenceError::RateLimited,
                code if code >= 500 => InferenceError::ServerError(message),
                _ => InferenceError::RequestFailed(message),
            });
        }

        let wire: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let candidate = wire
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| InferenceError::InvalidResponse("no candidates".to_string()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    name: call.name,
                    arguments: call.args,
                });
            }
        }

        debug!(
            text_len = text.len(),
            tool_calls = tool_calls.len(),
            "Completion received"
        );

        Ok(Completion {
            text,
            tool_calls,
            model: wire.model_version.unwrap_or(model),
            usage: wire.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, InferenceError> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    fn default_model(&self) -> &str {
        &self.config.text_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{Message, ToolResult};

    fn test_config() -> InferenceConfig {
        InferenceConfig {
            api_key: "test-key".to_string(),
            ..InferenceConfig::default()
        }
    }

    #[test]
    fn engine_requires_api_key() {
        let result = GeminiInferenceEngine::new(InferenceConfig::default());
        assert!(matches!(result, Err(InferenceError::ConnectionFailed(_))));
    }

    #[test]
    fn engine_creation_succeeds_with_key() {
        assert!(GeminiInferenceEngine::new(test_config()).is_ok());
    }

    #[test]
    fn model_resolution_prefers_override() {
        let engine = GeminiInferenceEngine::new(test_config()).unwrap();
        let req = InferenceRequest::text("hi").with_model("custom");
        assert_eq!(engine.resolve_model(&req), "custom");
    }

    #[test]
    fn media_requests_use_vision_model() {
        let mut config = test_config();
        config.vision_model = "gemini-vision".to_string();
        let engine = GeminiInferenceEngine::new(config).unwrap();

        let text_req = InferenceRequest::text("hi");
        assert_eq!(engine.resolve_model(&text_req), "gemini-1.5-flash");

        let media_req = InferenceRequest::with_media("hi", "image/png", vec![0]);
        assert_eq!(engine.resolve_model(&media_req), "gemini-vision");
    }

    #[test]
    fn media_parts_are_base64_encoded() {
        let message = Message::user_with_media("read", "image/png", vec![1, 2, 3]);
        let wire = to_wire_content(&message);
        let inline = wire.parts[1].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, BASE64.encode([1, 2, 3]));
    }

    #[test]
    fn tool_results_map_to_user_role() {
        let message = Message::tool_results(vec![ToolResult {
            name: "stats".to_string(),
            content: serde_json::json!({"count": 1}),
        }]);
        let wire = to_wire_content(&message);
        assert_eq!(wire.role.as_deref(), Some("user"));
        assert!(wire.parts[0].function_response.is_some());
    }

    #[test]
    fn response_parses_camel_case() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello"}]
                }
            }],
            "usageMetadata": {
                "promptTokenCount": 7,
                "candidatesTokenCount": 3,
                "totalTokenCount": 10
            },
            "modelVersion": "gemini-1.5-flash-002"
        }"#;
        let wire: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(wire.candidates.len(), 1);
        assert_eq!(wire.usage_metadata.unwrap().total_token_count, 10);
    }

    #[test]
    fn response_parses_function_call() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "stats", "args": {"from": "2025-01-01"}}}]
                }
            }]
        }"#;
        let wire: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let part = &wire.candidates[0].content.as_ref().unwrap().parts[0];
        let call = part.function_call.as_ref().unwrap();
        assert_eq!(call.name, "stats");
        assert_eq!(call.args["from"], "2025-01-01");
    }
}
