//! Dirty tracking for assigned relation values

use std::collections::{HashMap, HashSet};

use crate::config::RelationRegistry;
use crate::error::Result;
use crate::host::RelationHost;
use crate::ids::{self, Identifier};
use crate::snapshot::RelationSnapshot;

/// Relations assigned since the last sync, with their desired ids
#[derive(Debug, Default)]
pub struct DirtyTracker {
    marked: HashSet<String>,
    desired: HashMap<String, Vec<Identifier>>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` received an explicit value. Idempotent.
    pub fn mark_assigned(&mut self, name: &str) {
        self.marked.insert(name.to_string());
    }

    /// Store the desired ids for `name` and mark it
    pub fn assign(&mut self, name: &str, ids: Vec<Identifier>) {
        self.mark_assigned(name);
        self.desired.insert(name.to_string(), ids);
    }

    pub fn is_marked(&self, name: &str) -> bool {
        self.marked.contains(name)
    }

    pub fn desired(&self, name: &str) -> Option<&[Identifier]> {
        self.desired.get(name).map(Vec::as_slice)
    }

    /// Marked relations whose desired ids differ from the snapshot, in
    /// configuration order.
    ///
    /// A relation set back to its current contents is not reported. The
    /// snapshot is loaded for every marked relation.
    pub fn changed_relations<H: RelationHost>(
        &self,
        registry: &RelationRegistry,
        snapshot: &mut RelationSnapshot,
        host: &mut H,
    ) -> Result<Vec<String>> {
        let mut changed = Vec::new();

        for name in registry.relations() {
            if !self.marked.contains(name) {
                continue;
            }

            // marked without a stored value: nothing to reconcile
            let Some(desired) = self.desired.get(name) else {
                continue;
            };

            let current = snapshot.get(registry, &mut *host, name)?;
            if ids::same_set(desired, current) {
                log::debug!("Relation '{}' assigned but unchanged, skipping", name);
            } else {
                changed.push(name.clone());
            }
        }

        Ok(changed)
    }

    /// Forget the mark and desired value for `name` after a successful sync
    pub fn clear(&mut self, name: &str) {
        self.marked.remove(name);
        self.desired.remove(name);
    }
}
