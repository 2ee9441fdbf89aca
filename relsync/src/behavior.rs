//! Relation behavior attached to one host record
//!
//! Exposes each configured relation as an identifier-list property, keeps the
//! snapshot and dirty state for the record, and synchronises changed relations
//! when the host reports a successful insert or update.

use serde_json::Value;

use crate::config::{BehaviorConfig, RelationRegistry};
use crate::engine::{SyncEngine, SyncOutcome};
use crate::error::{Result, SyncError};
use crate::host::RelationHost;
use crate::ids::{self, Identifier};
use crate::snapshot::RelationSnapshot;
use crate::tracker::DirtyTracker;

/// Host lifecycle points after which relations are synchronised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    AfterInsert,
    AfterUpdate,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::AfterInsert => write!(f, "after-insert"),
            LifecycleEvent::AfterUpdate => write!(f, "after-update"),
        }
    }
}

/// Callback the host invokes synchronously once its own write committed
pub trait CommitListener {
    fn after_commit(&mut self, event: LifecycleEvent) -> Result<Vec<(String, SyncOutcome)>>;
}

/// Per-record facade over snapshot, tracker and engine
#[derive(Debug)]
pub struct RelationBehavior<H: RelationHost> {
    host: H,
    registry: RelationRegistry,
    snapshot: RelationSnapshot,
    tracker: DirtyTracker,
}

impl<H: RelationHost> RelationBehavior<H> {
    /// Attach a behavior to `host`. Invalid configuration is rejected here.
    pub fn new(host: H, config: BehaviorConfig) -> Result<Self> {
        Ok(RelationBehavior {
            host,
            registry: RelationRegistry::new(config)?,
            snapshot: RelationSnapshot::new(),
            tracker: DirtyTracker::new(),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn registry(&self) -> &RelationRegistry {
        &self.registry
    }

    /// Whether `property` is an identifier view handled by this behavior
    pub fn can_get_property(&self, property: &str) -> bool {
        self.registry
            .resolve_property(property)
            .is_some_and(|relation| self.host.relation_metadata(relation).is_some())
    }

    pub fn can_set_property(&self, property: &str) -> bool {
        self.can_get_property(property)
    }

    /// Read a property (`tagsIds`, or an alias)
    pub fn get(&mut self, property: &str) -> Result<Vec<Identifier>> {
        let relation = self.property_relation(property)?;
        self.relation_ids(&relation)
    }

    /// Assign a property from any JSON value accepted by [`ids::normalize`]
    pub fn set(&mut self, property: &str, value: &Value) -> Result<()> {
        let relation = self.property_relation(property)?;
        self.set_relation_ids(&relation, value)
    }

    /// Desired ids if assigned, otherwise the linked ids from the snapshot
    pub fn relation_ids(&mut self, name: &str) -> Result<Vec<Identifier>> {
        self.check_relation(name)?;

        if let Some(desired) = self.tracker.desired(name) {
            return Ok(desired.to_vec());
        }

        Ok(self.snapshot.get(&self.registry, &mut self.host, name)?.to_vec())
    }

    pub fn set_relation_ids(&mut self, name: &str, value: &Value) -> Result<()> {
        self.check_relation(name)?;
        let ids = ids::normalize(value)?;
        self.assign(name, ids);
        Ok(())
    }

    /// Assign already-typed identifiers
    pub fn assign_relation_ids(&mut self, name: &str, ids: Vec<Identifier>) -> Result<()> {
        self.check_relation(name)?;
        self.assign(name, ids::dedup(ids));
        Ok(())
    }

    /// Relations whose assigned value differs from what is linked
    pub fn changed_relations(&mut self) -> Result<Vec<String>> {
        self.tracker
            .changed_relations(&self.registry, &mut self.snapshot, &mut self.host)
    }

    /// Synchronise every changed relation, one after the other.
    ///
    /// Stops at the first error; relations synchronised before it stay
    /// committed.
    pub fn save(&mut self) -> Result<Vec<(String, SyncOutcome)>> {
        let changed = self.changed_relations()?;
        let mut results = Vec::with_capacity(changed.len());

        for name in changed {
            let desired = self.tracker.desired(&name).map(<[Identifier]>::to_vec).unwrap_or_default();
            let outcome = self.engine().sync(&name, &desired, true)?;
            results.push((name, outcome));
        }

        Ok(results)
    }

    /// Lifecycle entry point for the host
    pub fn on_lifecycle(&mut self, event: LifecycleEvent) -> Result<Vec<(String, SyncOutcome)>> {
        log::debug!("Relation behavior handling {} event", event);
        self.save()
    }

    /// Out-of-band sync of one relation, bypassing dirty tracking.
    ///
    /// Any pending assignment for the relation is discarded afterwards.
    pub fn sync(&mut self, name: &str, ids: &[Identifier], delete: bool) -> Result<SyncOutcome> {
        self.engine().sync(name, ids, delete)
    }

    /// Force the next read of `name` to query the host again
    pub fn refresh(&mut self, name: &str) {
        self.snapshot.invalidate(name);
    }

    fn engine(&mut self) -> SyncEngine<'_, H> {
        SyncEngine::new(
            &self.registry,
            &mut self.host,
            &mut self.snapshot,
            &mut self.tracker,
        )
    }

    fn assign(&mut self, name: &str, ids: Vec<Identifier>) {
        log::debug!("Relation '{}' assigned {} id(s)", name, ids.len());
        self.tracker.assign(name, ids);
    }

    fn property_relation(&self, property: &str) -> Result<String> {
        self.registry
            .resolve_property(property)
            .map(str::to_string)
            .ok_or_else(|| {
                SyncError::unknown_relation(property, "property does not map to a configured relation")
            })
    }

    fn check_relation(&self, name: &str) -> Result<()> {
        self.registry.require(name)?;
        if self.host.relation_metadata(name).is_none() {
            return Err(SyncError::unknown_relation(name, "host has no such relation"));
        }
        Ok(())
    }
}

impl<H: RelationHost> CommitListener for RelationBehavior<H> {
    fn after_commit(&mut self, event: LifecycleEvent) -> Result<Vec<(String, SyncOutcome)>> {
        self.on_lifecycle(event)
    }
}
