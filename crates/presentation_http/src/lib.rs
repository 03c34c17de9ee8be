//! HTTP presentation layer for belegbot
//!
//! Routes, handlers, session middleware, and the server binary.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, set_expose_internal_errors};
pub use middleware::rate_limit::{RateLimiterConfig, RateLimiterLayer};
pub use middleware::session::{CookieSigner, SessionContext, SessionLayer};
pub use routes::create_router;
pub use state::AppState;
