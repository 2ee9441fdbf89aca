//! Relation sync engine
//!
//! Computes the unlink/link delta between the snapshot and a desired id set,
//! then applies it through the host:
//! - unlink phase first, then link phase
//! - targets are processed in the order the host's bulk resolve returns them
//! - unlink targets that no longer exist are skipped
//! - link targets that do not exist raise `DanglingReference` after the
//!   resolvable ones are linked; unlinks already applied stand

use std::collections::HashSet;

use serde::Serialize;

use crate::config::RelationRegistry;
use crate::error::{Result, SyncError};
use crate::host::{LinkedEntity, RelationHost};
use crate::ids::{self, Identifier};
use crate::snapshot::RelationSnapshot;
use crate::tracker::DirtyTracker;

/// Ids linked and unlinked by one sync call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub linked: Vec<Identifier>,
    pub unlinked: Vec<Identifier>,
}

impl SyncOutcome {
    /// Check if the sync left the relation untouched
    pub fn is_noop(&self) -> bool {
        self.linked.is_empty() && self.unlinked.is_empty()
    }
}

/// Borrowed view over one behavior's state, valid for a single sync call
pub struct SyncEngine<'a, H: RelationHost> {
    registry: &'a RelationRegistry,
    host: &'a mut H,
    snapshot: &'a mut RelationSnapshot,
    tracker: &'a mut DirtyTracker,
}

impl<'a, H: RelationHost> SyncEngine<'a, H> {
    pub fn new(
        registry: &'a RelationRegistry,
        host: &'a mut H,
        snapshot: &'a mut RelationSnapshot,
        tracker: &'a mut DirtyTracker,
    ) -> Self {
        SyncEngine {
            registry,
            host,
            snapshot,
            tracker,
        }
    }

    /// Converge relation `name` to exactly `desired`.
    ///
    /// `delete_on_unlink` is passed to every unlink: delete the join or
    /// foreign-key row rather than null it. The snapshot for `name` is
    /// invalidated once the call got past the read, whatever the result; the
    /// tracker entry is cleared only on success.
    pub fn sync(
        &mut self,
        name: &str,
        desired: &[Identifier],
        delete_on_unlink: bool,
    ) -> Result<SyncOutcome> {
        self.registry.require(name)?;
        let descriptor = self
            .host
            .relation_metadata(name)
            .ok_or_else(|| SyncError::unknown_relation(name, "host has no such relation"))?;

        let current = self.snapshot.get(self.registry, &mut *self.host, name)?.to_vec();
        let desired = ids::dedup(desired.iter().cloned());

        let to_unlink = ids::diff(&current, &desired);
        let to_link = ids::diff(&desired, &current);

        log::debug!(
            "Sync '{}': {} current, {} desired, {} to unlink, {} to link",
            name,
            current.len(),
            desired.len(),
            to_unlink.len(),
            to_link.len()
        );

        if to_unlink.is_empty() && to_link.is_empty() {
            self.snapshot.invalidate(name);
            self.tracker.clear(name);
            return Ok(SyncOutcome::default());
        }

        let result = self.apply(name, &descriptor.target_type, to_unlink, to_link, delete_on_unlink);
        self.snapshot.invalidate(name);

        match &result {
            Ok(outcome) => {
                self.tracker.clear(name);
                log::info!(
                    "Synced relation '{}': {} linked, {} unlinked",
                    name,
                    outcome.linked.len(),
                    outcome.unlinked.len()
                );
            }
            Err(e) => log::warn!("Sync of relation '{}' failed: {}", name, e),
        }

        result
    }

    fn apply(
        &mut self,
        name: &str,
        target_type: &str,
        to_unlink: Vec<Identifier>,
        to_link: Vec<Identifier>,
        delete_on_unlink: bool,
    ) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        if !to_unlink.is_empty() {
            let entities = self.resolve(name, target_type, &to_unlink)?;

            if entities.len() < to_unlink.len() {
                log::warn!(
                    "Relation '{}': {} unlink target(s) no longer exist, skipping",
                    name,
                    to_unlink.len() - entities.len()
                );
            }

            for entity in &entities {
                self.host
                    .unlink(name, entity, delete_on_unlink)
                    .map_err(|e| SyncError::persistence(name, "unlink", e))?;
            }

            outcome.unlinked = to_unlink;
        }

        if !to_link.is_empty() {
            let entities = self.resolve(name, target_type, &to_link)?;

            for entity in &entities {
                self.host
                    .link(name, entity)
                    .map_err(|e| SyncError::persistence(name, "link", e))?;
                if let Some(id) = entity.identifier() {
                    outcome.linked.push(id);
                }
            }

            let missing = ids::diff(&to_link, &outcome.linked);
            if !missing.is_empty() {
                return Err(SyncError::DanglingReference {
                    relation: name.to_string(),
                    missing,
                    partial: outcome,
                });
            }

            outcome.linked = to_link;
        }

        Ok(outcome)
    }

    fn resolve(&mut self, name: &str, target_type: &str, wanted: &[Identifier]) -> Result<Vec<H::Entity>> {
        let entities = self
            .host
            .resolve_by_ids(target_type, wanted)
            .map_err(|e| SyncError::persistence(name, "resolve targets", e))?;

        // Hosts may hand back rows that were not asked for; only act on requested ids.
        let wanted: HashSet<&Identifier> = wanted.iter().collect();
        Ok(entities
            .into_iter()
            .filter(|entity| entity.identifier().is_some_and(|id| wanted.contains(&id)))
            .collect())
    }
}
