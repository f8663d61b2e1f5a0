use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A named metadata value attached to a content version.
///
/// Fields travel with every write, are stored inside the content record, and
/// are handed to the index so versions can later be found by metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

impl Field {
    /// Create a field, rejecting empty or whitespace-only names.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TypeError::InvalidFieldName(name));
        }
        Ok(Self {
            name,
            value: value.into(),
        })
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
