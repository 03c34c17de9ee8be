//! AI core for belegbot
//!
//! Hosted-model inference: receipt field extraction from media bytes and
//! tool-calling completions for the query agent. The concrete backend is the
//! Gemini generateContent API.

pub mod config;
pub mod error;
pub mod extraction;
pub mod gemini;
pub mod ports;

pub use config::InferenceConfig;
pub use error::InferenceError;
pub use extraction::{ExtractedFields, extraction_prompt, parse_extraction};
pub use gemini::GeminiInferenceEngine;
pub use ports::{
    Completion, ContentPart, InferenceEngine, InferenceRequest, Message, TokenUsage, ToolCall,
    ToolDefinition, ToolResult,
};
