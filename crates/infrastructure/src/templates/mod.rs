//! Template engine for the web pages
//!
//! Uses Tera with templates embedded at compile time. Pages: login,
//! verify, register, and the receipt dashboard.

use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;

/// Error type for template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template not found
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template rendering failed
    #[error("Template rendering failed: {0}")]
    Render(String),

    /// Template compilation failed
    #[error("Template compilation failed: {0}")]
    Compile(String),
}

impl From<tera::Error> for TemplateError {
    fn from(e: tera::Error) -> Self {
        match e.kind {
            tera::ErrorKind::TemplateNotFound(name) => Self::NotFound(name),
            _ => Self::Render(e.to_string()),
        }
    }
}

/// Embedded templates
const EMBEDDED: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("verify.html", include_str!("../../templates/verify.html")),
    (
        "register.html",
        include_str!("../../templates/register.html"),
    ),
    (
        "dashboard.html",
        include_str!("../../templates/dashboard.html"),
    ),
];

/// Template engine with the embedded page templates
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Create an engine with the embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED.to_vec())
            .map_err(|e| TemplateError::Compile(e.to_string()))?;

        debug!(count = EMBEDDED.len(), "Compiled embedded templates");
        Ok(Self { tera })
    }

    /// Render a template with a context
    pub fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        Ok(self.tera.render(name, context)?)
    }
}
