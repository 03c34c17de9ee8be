//! Infrastructure layer for belegbot
//!
//! Configuration, SQLite persistence, filesystem media storage, adapters
//! binding the integration clients to the application ports, and the web
//! template engine.

pub mod adapters;
pub mod config;
pub mod media_store;
pub mod persistence;
pub mod templates;

pub use adapters::{GeminiInferenceAdapter, TwilioMessengerAdapter, TwilioVerifyAdapter};
pub use config::{
    AppConfig, DatabaseConfig, MediaConfig, SecurityConfig, ServerConfig, TwilioConfig,
};
pub use media_store::FsMediaStore;
pub use persistence::{
    ConnectionPool, DatabaseError, SqliteDatabaseHealth, SqliteReceiptStore, SqliteSessionStore,
    SqliteUserStore, create_pool,
};
pub use templates::{TemplateEngine, TemplateError};
