//! User entity
//!
//! A user is identified by their phone number. Accounts are created either
//! through web registration or implicitly on the first inbound message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{EmailAddress, PhoneNumber, UserId};

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    id: UserId,
    /// Phone number (unique across users)
    phone_number: PhoneNumber,
    /// Display name (may be empty)
    name: String,
    /// Optional email address
    email: Option<EmailAddress>,
    /// When the account was created
    joined_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with only a phone number
    #[must_use]
    pub fn new(phone_number: PhoneNumber) -> Self {
        Self {
            id: UserId::new(),
            phone_number,
            name: String::new(),
            email: None,
            joined_at: Utc::now(),
        }
    }

    /// Create a new user with registration details
    #[must_use]
    pub fn with_details(
        phone_number: PhoneNumber,
        name: impl Into<String>,
        email: Option<EmailAddress>,
    ) -> Self {
        Self {
            id: UserId::new(),
            phone_number,
            name: name.into(),
            email,
            joined_at: Utc::now(),
        }
    }

    /// Restore a user from storage
    #[must_use]
    pub const fn restore(
        id: UserId,
        phone_number: PhoneNumber,
        name: String,
        email: Option<EmailAddress>,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            phone_number,
            name,
            email,
            joined_at,
        }
    }

    /// Get the user ID
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Get the phone number
    #[must_use]
    pub const fn phone_number(&self) -> &PhoneNumber {
        &self.phone_number
    }

    /// Get the display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the email address
    #[must_use]
    pub const fn email(&self) -> Option<&EmailAddress> {
        self.email.as_ref()
    }

    /// Get the account creation timestamp
    #[must_use]
    pub const fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }
}
