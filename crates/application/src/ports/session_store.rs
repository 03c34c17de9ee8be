//! Session storage port
//!
//! Web sessions carry the logged-in user and the pending OTP verification
//! state between the login/registration form and the verify form.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use domain::{EmailAddress, PhoneNumber, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApplicationError;

/// Verification state awaiting an OTP check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingVerification {
    /// Login for an existing (or implicitly created) account
    Login { phone: PhoneNumber },
    /// Registration with profile details
    Registration {
        phone: PhoneNumber,
        name: String,
        email: Option<EmailAddress>,
    },
}

impl PendingVerification {
    /// The phone number awaiting verification
    #[must_use]
    pub const fn phone(&self) -> &PhoneNumber {
        match self {
            Self::Login { phone } | Self::Registration { phone, .. } => phone,
        }
    }
}

/// A web session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier (carried in a signed cookie)
    pub id: String,
    /// Logged-in user, if any
    pub user_id: Option<UserId>,
    /// Pending OTP verification state
    pub pending: Option<PendingVerification>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Default session lifetime
    pub const LIFETIME_HOURS: i64 = 24 * 14;

    /// Create a new anonymous session
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id: None,
            pending: None,
            created_at: now,
            expires_at: now + Duration::hours(Self::LIFETIME_HOURS),
        }
    }

    /// Whether the session has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Whether a user is logged in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Port for session storage operations
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Save or update a session
    async fn save(&self, session: &Session) -> Result<(), ApplicationError>;

    /// Get a session by ID; expired sessions are treated as absent
    async fn get(&self, session_id: &str) -> Result<Option<Session>, ApplicationError>;

    /// Delete a session
    async fn delete(&self, session_id: &str) -> Result<bool, ApplicationError>;

    /// Remove expired sessions, returning the number deleted
    async fn purge_expired(&self) -> Result<u64, ApplicationError>;
}
