//! Gemini inference engine implementation
//!
//! Talks to the Google generative language REST API (generateContent), which
//! hosts both the text and the multimodal receipt models.

mod client;

pub use client::GeminiInferenceEngine;
