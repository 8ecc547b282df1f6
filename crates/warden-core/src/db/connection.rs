//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::fmt;
use std::path::PathBuf;

use super::migrations;

/// Where the primary backend lives
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Remote libSQL/Turso database (e.g., `libsql://your-db.turso.io`)
    Remote { url: String, auth_token: String },
    /// Local database file
    Local { path: PathBuf },
    /// Throwaway in-memory database (useful for testing)
    Memory,
}

impl BackendConfig {
    /// Create a remote configuration
    pub fn remote(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self::Remote {
            url: url.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Create a local file configuration
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Connection target without credentials
    pub fn describe(&self) -> String {
        match self {
            Self::Remote { url, .. } => url.clone(),
            Self::Local { path } => path.display().to_string(),
            Self::Memory => ":memory:".to_string(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote { url, .. } => formatter
                .debug_struct("Remote")
                .field("url", url)
                .field("auth_token", &"[REDACTED]")
                .finish(),
            Self::Local { path } => formatter.debug_struct("Local").field("path", path).finish(),
            Self::Memory => formatter.write_str("Memory"),
        }
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open the database described by `config`, creating the schema if needed
    ///
    /// Runs migrations automatically.
    pub async fn open(config: &BackendConfig) -> Result<Self> {
        let db = match config {
            BackendConfig::Remote { url, auth_token } => {
                if url.trim().is_empty() {
                    return Err(Error::InvalidInput("Database URL is required".into()));
                }
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await?
            }
            BackendConfig::Local { path } => {
                if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let path_str = path.to_string_lossy().to_string();
                Builder::new_local(&path_str).build().await?
            }
            BackendConfig::Memory => Builder::new_local(":memory:").build().await?,
        };
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        if !config.is_remote() {
            database.configure().await?;
        }
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(&BackendConfig::Memory).await
    }

    /// Configure local `SQLite` files for durability
    async fn configure(&self) -> Result<()> {
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok(); // Not supported for in-memory databases
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Round-trip a trivial query to verify the connection is alive
    pub async fn ping(&self) -> Result<()> {
        let mut rows = self.conn.query("SELECT 1", ()).await?;
        match rows.next().await? {
            Some(_) => Ok(()),
            None => Err(Error::Database("ping returned no rows".into())),
        }
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
