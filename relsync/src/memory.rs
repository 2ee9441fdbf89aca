//! In-memory host backed by a serde dataset
//!
//! Used by the CLI (datasets are JSON files) and by tests. Every link and
//! unlink is journaled, and every host call is counted, so callers can check
//! exactly which operations a sync issued.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::host::{LinkedEntity, RelationDescriptor, RelationHost};
use crate::ids::Identifier;

/// Relation metadata, target entities and owner records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub relations: Vec<RelationDescriptor>,
    /// Existing target entity ids per target type
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<Identifier>>,
    /// Owner record id -> relation name -> linked values.
    /// `null` stands for a linked value that has not been saved yet.
    #[serde(default)]
    pub records: BTreeMap<String, BTreeMap<String, Vec<Option<Identifier>>>>,
}

impl Dataset {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize dataset")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write dataset: {}", path.display()))
    }

    /// One record, one junction relation, integer ids
    pub fn fixture(
        record: &str,
        relation: &str,
        target_type: &str,
        existing: &[i64],
        linked: &[i64],
    ) -> Self {
        let mut dataset = Dataset::default();
        dataset.add_relation(RelationDescriptor::junction(
            relation,
            target_type,
            format!("{}_{}", record, relation),
        ));
        dataset.add_entities(target_type, existing.iter().map(|id| Identifier::Int(*id)));
        dataset
            .records
            .entry(record.to_string())
            .or_default()
            .insert(
                relation.to_string(),
                linked.iter().map(|id| Some(Identifier::Int(*id))).collect(),
            );
        dataset
    }

    pub fn add_relation(&mut self, descriptor: RelationDescriptor) {
        self.relations.retain(|r| r.name != descriptor.name);
        self.relations.push(descriptor);
    }

    /// Register target entities; kept sorted in primary-key order
    pub fn add_entities(&mut self, target_type: &str, ids: impl IntoIterator<Item = Identifier>) {
        let entry = self.entities.entry(target_type.to_string()).or_default();
        entry.extend(ids);
        entry.sort();
        entry.dedup();
    }

    pub fn remove_entity(&mut self, target_type: &str, id: &Identifier) {
        if let Some(ids) = self.entities.get_mut(target_type) {
            ids.retain(|existing| existing != id);
        }
    }

    /// Link a value that has no identifier yet
    pub fn push_unsaved_link(&mut self, record: &str, relation: &str) {
        self.records
            .entry(record.to_string())
            .or_default()
            .entry(relation.to_string())
            .or_default()
            .push(None);
    }

    /// Persisted ids currently linked from `record` through `relation`
    pub fn linked_ids(&self, record: &str, relation: &str) -> Vec<Identifier> {
        self.records
            .get(record)
            .and_then(|relations| relations.get(relation))
            .map(|values| values.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }
}

/// Entity handed to the engine by [`MemoryHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntity {
    pub target_type: String,
    pub id: Option<Identifier>,
}

impl LinkedEntity for MemoryEntity {
    fn identifier(&self) -> Option<Identifier> {
        self.id.clone()
    }
}

/// A write issued against the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    Link { relation: String, id: Identifier },
    Unlink { relation: String, id: Identifier, delete: bool },
}

impl std::fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JournalEntry::Link { relation, id } => write!(f, "link {} {}", relation, id),
            JournalEntry::Unlink {
                relation,
                id,
                delete,
            } => {
                let mode = if *delete { "delete" } else { "detach" };
                write!(f, "unlink {} {} ({})", relation, id, mode)
            }
        }
    }
}

/// Host call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub metadata_lookups: usize,
    pub linked_queries: usize,
    pub resolves: usize,
    pub links: usize,
    pub unlinks: usize,
}

impl CallCounts {
    /// Every call that would reach the datastore
    pub fn total(&self) -> usize {
        self.metadata_lookups + self.linked_queries + self.resolves + self.links + self.unlinks
    }

    pub fn writes(&self) -> usize {
        self.links + self.unlinks
    }
}

/// Host operation that can be made to fail in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    LoadLinked,
    Resolve,
    Link,
    Unlink,
}

/// One owner record of a [`Dataset`] acting as a [`RelationHost`]
#[derive(Debug)]
pub struct MemoryHost<'a> {
    dataset: &'a mut Dataset,
    record: String,
    journal: Vec<JournalEntry>,
    calls: std::cell::Cell<CallCounts>,
    failing: Option<HostOp>,
}

impl<'a> MemoryHost<'a> {
    pub fn new(dataset: &'a mut Dataset, record: &str) -> anyhow::Result<Self> {
        if !dataset.records.contains_key(record) {
            anyhow::bail!("Record '{}' does not exist in dataset", record);
        }

        Ok(MemoryHost {
            dataset,
            record: record.to_string(),
            journal: Vec::new(),
            calls: std::cell::Cell::new(CallCounts::default()),
            failing: None,
        })
    }

    /// Writes issued so far, in order
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    /// Make every subsequent call of `op` fail
    pub fn fail_on(&mut self, op: HostOp) {
        self.failing = Some(op);
    }

    fn count(&self, update: impl FnOnce(&mut CallCounts)) {
        let mut calls = self.calls.get();
        update(&mut calls);
        self.calls.set(calls);
    }

    fn check(&self, op: HostOp) -> anyhow::Result<()> {
        if self.failing == Some(op) {
            anyhow::bail!("simulated {:?} failure", op);
        }
        Ok(())
    }

    fn links_mut(&mut self, relation: &str) -> &mut Vec<Option<Identifier>> {
        self.dataset
            .records
            .entry(self.record.clone())
            .or_default()
            .entry(relation.to_string())
            .or_default()
    }

    fn target_type(&self, relation: &str) -> String {
        self.dataset
            .relations
            .iter()
            .find(|r| r.name == relation)
            .map(|r| r.target_type.clone())
            .unwrap_or_default()
    }
}

impl RelationHost for MemoryHost<'_> {
    type Entity = MemoryEntity;

    fn relation_metadata(&self, name: &str) -> Option<RelationDescriptor> {
        self.count(|c| c.metadata_lookups += 1);
        self.dataset.relations.iter().find(|r| r.name == name).cloned()
    }

    fn currently_linked(&mut self, name: &str) -> anyhow::Result<Vec<MemoryEntity>> {
        self.count(|c| c.linked_queries += 1);
        self.check(HostOp::LoadLinked)?;

        let target_type = self.target_type(name);
        let values = self
            .dataset
            .records
            .get(&self.record)
            .and_then(|relations| relations.get(name))
            .cloned()
            .unwrap_or_default();

        Ok(values
            .into_iter()
            .map(|id| MemoryEntity {
                target_type: target_type.clone(),
                id,
            })
            .collect())
    }

    fn resolve_by_ids(
        &mut self,
        target_type: &str,
        ids: &[Identifier],
    ) -> anyhow::Result<Vec<MemoryEntity>> {
        self.count(|c| c.resolves += 1);
        self.check(HostOp::Resolve)?;

        let wanted: HashSet<&Identifier> = ids.iter().collect();
        let found = self
            .dataset
            .entities
            .get(target_type)
            .map(|existing| {
                existing
                    .iter()
                    .filter(|id| wanted.contains(id))
                    .map(|id| MemoryEntity {
                        target_type: target_type.to_string(),
                        id: Some(id.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(found)
    }

    fn link(&mut self, name: &str, entity: &MemoryEntity) -> anyhow::Result<()> {
        self.count(|c| c.links += 1);
        self.check(HostOp::Link)?;

        let id = entity
            .id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Cannot link an unsaved {}", entity.target_type))?;

        self.links_mut(name).push(Some(id.clone()));
        self.journal.push(JournalEntry::Link {
            relation: name.to_string(),
            id,
        });
        Ok(())
    }

    fn unlink(&mut self, name: &str, entity: &MemoryEntity, delete: bool) -> anyhow::Result<()> {
        self.count(|c| c.unlinks += 1);
        self.check(HostOp::Unlink)?;

        let id = entity
            .id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Cannot unlink an unsaved {}", entity.target_type))?;

        self.links_mut(name).retain(|linked| linked.as_ref() != Some(&id));
        self.journal.push(JournalEntry::Unlink {
            relation: name.to_string(),
            id,
            delete,
        });
        Ok(())
    }
}
