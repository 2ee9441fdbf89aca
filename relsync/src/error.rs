//! Error taxonomy for relation synchronization

use crate::engine::SyncOutcome;
use crate::ids::Identifier;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by the registry, snapshot cache, engine and facade.
///
/// Nothing here is retried or swallowed internally; every variant reaches the
/// immediate caller.
#[derive(Debug)]
pub enum SyncError {
    /// Relation name is not configured, or the host has no such relation
    UnknownRelation { name: String, reason: String },
    /// Desired ids that do not resolve to an existing target entity.
    /// `partial` holds what was actually applied before the failure.
    DanglingReference {
        relation: String,
        missing: Vec<Identifier>,
        partial: SyncOutcome,
    },
    /// Rejected at construction time
    Configuration(String),
    /// A value that cannot act as an identifier (e.g. `true` or `1.5`)
    InvalidIdentifier { value: String },
    /// Error raised by the host persistence layer
    Persistence {
        relation: String,
        operation: &'static str,
        source: anyhow::Error,
    },
}

impl SyncError {
    pub(crate) fn unknown_relation(name: &str, reason: impl Into<String>) -> Self {
        SyncError::UnknownRelation {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(relation: &str, operation: &'static str, source: anyhow::Error) -> Self {
        SyncError::Persistence {
            relation: relation.to_string(),
            operation,
            source,
        }
    }

    /// Check if this is an unknown relation error
    pub fn is_unknown_relation(&self) -> bool {
        matches!(self, SyncError::UnknownRelation { .. })
    }

    /// Check if this is a dangling reference error
    pub fn is_dangling_reference(&self) -> bool {
        matches!(self, SyncError::DanglingReference { .. })
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::UnknownRelation { name, reason } => {
                write!(f, "Unknown relation '{}': {}", name, reason)
            }
            SyncError::DanglingReference {
                relation, missing, ..
            } => {
                let ids: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
                write!(
                    f,
                    "Relation '{}' references missing target(s): {}",
                    relation,
                    ids.join(", ")
                )
            }
            SyncError::Configuration(msg) => write!(f, "Invalid configuration: {}", msg),
            SyncError::InvalidIdentifier { value } => {
                write!(f, "Value '{}' cannot be used as an identifier", value)
            }
            SyncError::Persistence {
                relation,
                operation,
                source,
            } => {
                write!(f, "Failed to {} on relation '{}': {}", operation, relation, source)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Persistence { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
