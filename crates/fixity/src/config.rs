use std::path::Path;

use fixity_chunk::DEFAULT_AVERAGE_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{FixityError, FixityResult};

/// Runtime configuration for [`crate::Fixity`].
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// default_average_chunk_size = 65536
/// inherit_average_chunk_size = true
/// fsync = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixityConfig {
    /// Average chunk size used when a write gives no override and there is
    /// no previous version to inherit from.
    pub default_average_chunk_size: u64,
    /// Reuse the previous version's average chunk size so boundaries stay
    /// aligned across versions of one id.
    pub inherit_average_chunk_size: bool,
    /// Sync the pointer log to disk on every update.
    pub fsync: bool,
}

impl Default for FixityConfig {
    fn default() -> Self {
        Self {
            default_average_chunk_size: DEFAULT_AVERAGE_CHUNK_SIZE,
            inherit_average_chunk_size: true,
            fsync: true,
        }
    }
}

impl FixityConfig {
    pub fn from_toml_str(text: &str) -> FixityResult<Self> {
        toml::from_str(text).map_err(|e| FixityError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> FixityResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> FixityResult<String> {
        toml::to_string(self).map_err(|e| FixityError::Config(e.to_string()))
    }
}
