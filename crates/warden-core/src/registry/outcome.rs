//! Results of registry operations

use serde::Serialize;

use crate::connector::ConnectorStatus;
use crate::models::{Entry, Snapshot};
use crate::state::{ConnectionMode, DataSource};

/// Outcome of a mutating call plus where it was served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub outcome: T,
    pub source: DataSource,
    /// Set when the local cache could not be written; the change still stands
    pub warning: Option<String>,
}

impl<T> Applied<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Applied<U> {
        Applied {
            outcome: f(self.outcome),
            source: self.source,
            warning: self.warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Created(Entry),
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(Entry),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Found(Entry),
    NotFound,
}

impl CheckOutcome {
    pub const fn is_whitelisted(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub const fn entry(&self) -> Option<&Entry> {
        match self {
            Self::Found(entry) => Some(entry),
            Self::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed(Entry),
    NotFound,
}

/// Result of a sync or import: the registry's collection after the call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub snapshot: Snapshot,
    pub changed: bool,
}

/// Health introspection for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub mode: ConnectionMode,
    /// Local-only changes not yet written to the primary
    pub pending_reconciliation: bool,
    pub primary_target: String,
    pub cache_location: String,
    pub connector: ConnectorStatus,
}
