//! Many-to-many relation reconciliation
//!
//! Given the ids currently linked through a relation and a desired id set,
//! `relsync` computes the minimal unlink/link operations, applies them through
//! a host persistence layer, and tracks which relations of a record actually
//! changed so only those are synchronised.
//!
//! ```no_run
//! use relsync::{BehaviorConfig, Dataset, LifecycleEvent, MemoryHost, RelationBehavior};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut dataset = Dataset::fixture("post", "tags", "tag", &[1, 2, 3, 4], &[1, 2, 3]);
//! let host = MemoryHost::new(&mut dataset, "post")?;
//! let mut behavior = RelationBehavior::new(host, BehaviorConfig::new(["tags"]))?;
//!
//! behavior.set("tagsIds", &json!([2, 3, 4]))?;
//! let synced = behavior.on_lifecycle(LifecycleEvent::AfterUpdate)?;
//! assert_eq!(synced.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod behavior;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod ids;
pub mod memory;
pub mod snapshot;
pub mod tracker;

pub use behavior::{CommitListener, LifecycleEvent, RelationBehavior};
pub use config::{BehaviorConfig, RelationRegistry};
pub use engine::{SyncEngine, SyncOutcome};
pub use error::{Result, SyncError};
pub use host::{ForeignKeyBinding, LinkedEntity, RelationDescriptor, RelationHost};
pub use ids::{Identifier, diff, normalize};
pub use memory::{Dataset, JournalEntry, MemoryEntity, MemoryHost};
pub use snapshot::RelationSnapshot;
pub use tracker::DirtyTracker;
