//! Receipt media storage configuration.

use serde::{Deserialize, Serialize};

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory receipt files are stored under
    #[serde(default = "default_root")]
    pub root: String,

    /// Maximum accepted media size in bytes (default: 10MB)
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_root() -> String {
    "media/receipts".to_string()
}

const fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            max_bytes: default_max_bytes(),
        }
    }
}
