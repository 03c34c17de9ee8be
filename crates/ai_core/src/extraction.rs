//! Receipt field extraction
//!
//! The fixed prompt sent with receipt media and the parsing of the model's
//! JSON answer into raw wire fields. Validation into domain types happens in
//! the application layer.

use serde::Deserialize;

use crate::error::InferenceError;

/// Raw extraction fields as returned by the model
///
/// `total_amount` is kept as a JSON value because models return it both as a
/// number and as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub total_amount: Option<serde_json::Value>,
}

/// Build the extraction prompt
///
/// `inline_content` carries the receipt text for text documents and stays
/// empty when the receipt goes along as inline media.
#[must_use]
pub fn extraction_prompt(inline_content: &str) -> String {
    format!(
        "You are a receipt processing expert. Please extract the following information \
         from the receipt content and provide the output in JSON format:\n\
         \n\
         \"date\": \"date on the receipt\",\n\
         \"vendor\": \"vendor or store name\",\n\
         \"total_amount\": \"total amount\"\n\
         \n\
         Return Date in the format DD-MM-YYYY, Vendor/Store Name as a string, and \
         Total Amount as a number.\n\
         Always return a single valid JSON object.\n\
         Receipt Content:{inline_content}"
    )
}

/// Parse the model's answer into extraction fields
///
/// Tolerates markdown code fences and leading/trailing prose around the JSON
/// object.
pub fn parse_extraction(text: &str) -> Result<ExtractedFields, InferenceError> {
    let candidate = strip_code_fences(text);
    let json_slice = extract_json_object(candidate)
        .ok_or_else(|| InferenceError::InvalidResponse("no JSON object in response".to_string()))?;

    serde_json::from_str(json_slice)
        .map_err(|e| InferenceError::InvalidResponse(format!("malformed extraction JSON: {e}")))
}

/// Strip a surrounding markdown code fence, if present
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the fence line
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map_or(rest, str::trim).trim()
}

/// Find the outermost JSON object in free-form text
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
