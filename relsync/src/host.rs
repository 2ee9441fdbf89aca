//! Interfaces consumed from the host persistence layer
//!
//! The engine never talks to a datastore directly. A host record implements
//! [`RelationHost`] and exposes its relation metadata, its currently linked
//! entities, bulk lookup of target entities, and single link/unlink calls.

use serde::{Deserialize, Serialize};

use crate::ids::Identifier;

/// How a relation is stored by the host. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForeignKeyBinding {
    /// Join table between owner and target
    Junction {
        table: String,
        owner_column: String,
        target_column: String,
    },
    /// Foreign key column on the target table
    TargetColumn { column: String },
}

/// Relation metadata as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Association name (e.g. "tags")
    pub name: String,
    /// Target entity type (e.g. "tag")
    pub target_type: String,
    /// Linkage details, passed through untouched
    pub foreign_key: ForeignKeyBinding,
}

impl RelationDescriptor {
    pub fn junction(
        name: impl Into<String>,
        target_type: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let target_type = target_type.into();
        RelationDescriptor {
            foreign_key: ForeignKeyBinding::Junction {
                table: table.into(),
                owner_column: "owner_id".to_string(),
                target_column: format!("{}_id", target_type),
            },
            name,
            target_type,
        }
    }
}

/// A value linked through a relation
pub trait LinkedEntity {
    /// Primary key, or `None` when the entity has not been persisted yet
    fn identifier(&self) -> Option<Identifier>;
}

/// The host record whose relations are being reconciled.
///
/// All calls are blocking. Errors are reported as-is; the engine does not
/// retry.
pub trait RelationHost {
    type Entity: LinkedEntity;

    /// Metadata for a relation, `None` if the host has no such relation
    fn relation_metadata(&self, name: &str) -> Option<RelationDescriptor>;

    /// Entities currently linked through `name`
    fn currently_linked(&mut self, name: &str) -> anyhow::Result<Vec<Self::Entity>>;

    /// Fetch target entities by id. Ids that do not exist are absent from
    /// the result, not an error.
    fn resolve_by_ids(
        &mut self,
        target_type: &str,
        ids: &[Identifier],
    ) -> anyhow::Result<Vec<Self::Entity>>;

    fn link(&mut self, name: &str, entity: &Self::Entity) -> anyhow::Result<()>;

    /// Remove a link. `delete` drops the join/foreign-key row instead of
    /// nulling it.
    fn unlink(&mut self, name: &str, entity: &Self::Entity, delete: bool) -> anyhow::Result<()>;
}
