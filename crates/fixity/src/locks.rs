use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{FixityError, FixityResult};

/// One mutex per id, created on first use.
///
/// Writers to different ids never contend past the brief map lookup.
/// Entries are kept for the life of the table; each costs one small
/// allocation per distinct id.
#[derive(Debug, Default)]
pub(crate) struct IdLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdLocks {
    /// The lock for `id`. The caller locks it for the duration of its update.
    pub(crate) fn for_id(&self, id: &str) -> FixityResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| FixityError::LockPoisoned)?;
        Ok(Arc::clone(locks.entry(id.to_string()).or_default()))
    }
}
