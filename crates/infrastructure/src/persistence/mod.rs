//! SQLite persistence
//!
//! Connection pooling, schema migrations, and the store implementations of
//! the application ports.

pub mod connection;
pub mod database_health;
pub mod migrations;
pub mod receipt_store;
pub mod session_store;
pub mod user_store;

pub use connection::{ConnectionPool, DatabaseError, PooledConn, create_pool};
pub use database_health::SqliteDatabaseHealth;
pub use receipt_store::SqliteReceiptStore;
pub use session_store::SqliteSessionStore;
pub use user_store::SqliteUserStore;
