//! Application configuration
//!
//! Split into focused sub-modules by domain:
//! - `server`: HTTP server settings
//! - `database`: SQLite database settings
//! - `security`: session signing, rate limiting
//! - `twilio`: messaging and phone verification provider
//! - `media`: receipt media storage
//!
//! The inference section reuses [`ai_core::InferenceConfig`].

mod database;
mod media;
mod security;
mod server;
mod twilio;

use ai_core::InferenceConfig;
use serde::{Deserialize, Serialize};

pub use database::DatabaseConfig;
pub use media::MediaConfig;
pub use security::SecurityConfig;
pub use server::ServerConfig;
pub use twilio::TwilioConfig;

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Security settings
    #[serde(default)]
    pub security: SecurityConfig,

    /// Twilio settings
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// Inference settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Media storage settings
    #[serde(default)]
    pub media: MediaConfig,
}

impl AppConfig {
    /// Load configuration from environment and optional file
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Load from file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (e.g., BELEGBOT_SERVER_PORT)
            .add_source(
                config::Environment::with_prefix("BELEGBOT")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
