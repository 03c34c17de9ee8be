//! User storage port

use async_trait::async_trait;
use domain::{PhoneNumber, User, UserId};

use crate::error::ApplicationError;

/// Port for user storage operations
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Save or update a user
    async fn save(&self, user: &User) -> Result<(), ApplicationError>;

    /// Get a user by ID
    async fn get(&self, user_id: &UserId) -> Result<Option<User>, ApplicationError>;

    /// Find a user by phone number
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<User>, ApplicationError>;

    /// Get the user with this phone number, creating a bare account if none exists
    ///
    /// Inbound messages from unknown numbers create an account implicitly.
    async fn get_or_create(&self, phone: &PhoneNumber) -> Result<User, ApplicationError>;
}
