//! Media storage port
//!
//! Stores the original receipt files (images, PDFs) alongside the extracted
//! rows.

use async_trait::async_trait;

use crate::error::ApplicationError;

/// Port for receipt media storage
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store media bytes under the given filename, returning the stored name
    async fn save(&self, filename: &str, data: &[u8]) -> Result<String, ApplicationError>;

    /// Load media bytes by filename
    async fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, ApplicationError>;

    /// Delete a stored file, returning whether it existed
    async fn delete(&self, filename: &str) -> Result<bool, ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn MediaStore) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn MediaStore>();
    }
}
