//! warden-core - Core library for Warden
//!
//! This crate contains the whitelist models, the primary backend and local
//! cache layers, and the registry that reconciles them. The API server and
//! the CLI are thin shells around [`RegistryStore`].

pub mod cache;
pub mod connector;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod registry;
pub mod state;
pub mod stats;
pub mod util;

pub use cache::{FileCache, MemoryCache, SnapshotCache};
pub use connector::{BackendConnector, ConnectorStatus, Health};
pub use db::{BackendConfig, LibSqlBackend, PrimaryBackend};
pub use error::{Error, Result};
pub use models::{Entry, GameId, Snapshot};
pub use registry::{
    AddOutcome, Applied, CheckOutcome, ConnectionInfo, RegistryOptions, RegistryStore,
    RemoveOutcome, RenameOutcome, SyncOutcome,
};
pub use state::{ConnectionMode, DataSource};
pub use stats::RegistryStats;
