//! TwiML response building
//!
//! The webhook answers with a minimal TwiML document. Only the `<Message>`
//! verb is needed here.

use std::fmt::Write as _;

/// A TwiML messaging response
#[derive(Debug, Clone, Default)]
pub struct MessagingResponse {
    messages: Vec<String>,
}

impl MessagingResponse {
    /// Create an empty response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the response
    #[must_use]
    pub fn message(mut self, body: impl Into<String>) -> Self {
        self.messages.push(body.into());
        self
    }

    /// Render the TwiML document
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for body in &self.messages {
            let _ = write!(xml, "<Message>{}</Message>", escape_xml(body));
        }
        xml.push_str("</Response>");
        xml
    }
}

/// Escape the five XML special characters
fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
