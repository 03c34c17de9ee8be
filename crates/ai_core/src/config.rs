//! Configuration for the inference engine

use serde::{Deserialize, Serialize};

/// Configuration for the hosted inference backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the generative language API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key for the hosted model
    #[serde(default)]
    pub api_key: String,

    /// Default model for text-only requests
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model for requests carrying media (images, PDFs)
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_vision_model() -> String {
    "gemini-1.5-flash".to_string()
}

const fn default_timeout_ms() -> u64 {
    60000 // 60 seconds
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_temperature() -> f32 {
    0.2
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            text_model: default_text_model(),
            vision_model: default_vision_model(),
            timeout_ms: default_timeout_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}
