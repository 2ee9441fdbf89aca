//! Lazily loaded view of the currently linked ids per relation

use std::collections::HashMap;

use crate::config::RelationRegistry;
use crate::error::{Result, SyncError};
use crate::host::{LinkedEntity, RelationHost};
use crate::ids::{self, Identifier};

/// Cache of linked identifiers, keyed by relation name.
///
/// Owned by one behavior instance and dropped with it. An entry is loaded at
/// most once until [`RelationSnapshot::invalidate`] is called.
#[derive(Debug, Default)]
pub struct RelationSnapshot {
    entries: HashMap<String, Vec<Identifier>>,
}

impl RelationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently linked ids for `name`, querying the host on first access.
    ///
    /// Unknown names fail before any host call is made. Linked values
    /// without an identifier (not yet persisted) are skipped.
    pub fn get<H: RelationHost>(
        &mut self,
        registry: &RelationRegistry,
        host: &mut H,
        name: &str,
    ) -> Result<&[Identifier]> {
        registry.require(name)?;

        if !self.entries.contains_key(name) {
            let linked = host
                .currently_linked(name)
                .map_err(|e| SyncError::persistence(name, "load linked entities", e))?;

            let total = linked.len();
            let loaded = ids::dedup(linked.iter().filter_map(|entity| entity.identifier()));

            if loaded.len() < total {
                log::debug!(
                    "Snapshot '{}': skipped {} linked value(s) without an identifier",
                    name,
                    total - loaded.len()
                );
            }
            log::debug!("Snapshot '{}' loaded with {} id(s)", name, loaded.len());

            self.entries.insert(name.to_string(), loaded);
        }

        Ok(self.entries.get(name).map(Vec::as_slice).unwrap_or_default())
    }

    /// Drop the cached ids so the next `get` queries the host again
    pub fn invalidate(&mut self, name: &str) {
        if self.entries.remove(name).is_some() {
            log::debug!("Snapshot '{}' invalidated", name);
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}
