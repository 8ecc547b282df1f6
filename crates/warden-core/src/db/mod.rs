//! Primary backend layer

mod connection;
mod migrations;
mod repository;

pub use connection::{BackendConfig, Database};
pub use repository::{LibSqlBackend, PrimaryBackend};
