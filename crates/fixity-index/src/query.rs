use fixity_types::Field;
use serde::{Deserialize, Serialize};

/// A conjunction of exact matches.
///
/// An empty query matches every indexed content version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: Option<String>,
    pub fields: Vec<Field>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only versions written under `id`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Only versions carrying `field` with exactly this value.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.fields.is_empty()
    }
}
