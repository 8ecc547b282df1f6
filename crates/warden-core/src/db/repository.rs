//! Primary backend abstraction and its libSQL implementation

use chrono::{DateTime, Utc};
use libsql::{Connection, Value};
use tokio::sync::Mutex;

use super::connection::{BackendConfig, Database};
use crate::error::{Error, Result};
use crate::models::{Entry, GameId, Snapshot};
use crate::util;

const SAVED_AT_KEY: &str = "saved_at";

/// Operations the registry needs from its preferred, network-reachable store
#[allow(async_fn_in_trait)]
pub trait PrimaryBackend {
    /// Connection target without credentials
    fn describe(&self) -> String;

    /// Establish the connection if needed and verify it answers
    async fn connect(&self) -> Result<()>;

    /// Drop a connection that failed so the next `connect` starts fresh
    async fn disconnect(&self);

    /// Read the whole collection
    async fn load_snapshot(&self) -> Result<Snapshot>;

    /// Insert an entry; `false` when the key already exists
    async fn insert_entry(&self, entry: &Entry, saved_at: DateTime<Utc>) -> Result<bool>;

    /// Overwrite the mutable fields of an entry; `false` when the key is absent
    async fn update_entry(&self, entry: &Entry, saved_at: DateTime<Utc>) -> Result<bool>;

    /// Delete by key; `false` when the key is absent
    async fn delete_entry(&self, game_id: &GameId, saved_at: DateTime<Utc>) -> Result<bool>;

    /// Replace the whole collection and its clock
    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()>;
}

/// libSQL implementation of `PrimaryBackend`
///
/// The connection is opened lazily on the first `connect` and reused until a
/// failure calls `disconnect`.
pub struct LibSqlBackend {
    config: BackendConfig,
    db: Mutex<Option<Database>>,
}

impl LibSqlBackend {
    pub const fn new(config: BackendConfig) -> Self {
        Self {
            config,
            db: Mutex::const_new(None),
        }
    }

    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn not_connected() -> Error {
        Error::Database("primary backend is not connected".into())
    }

    async fn set_saved_at(conn: &Connection, saved_at: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "INSERT INTO registry_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)",
            vec![
                Value::Text(SAVED_AT_KEY.to_string()),
                Value::Integer(saved_at.timestamp_millis()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn read_saved_at(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
        let mut rows = conn
            .query(
                "SELECT value FROM registry_meta WHERE key = ?1",
                vec![Value::Text(SAVED_AT_KEY.to_string())],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(util::from_millis(row.get::<i64>(0)?))),
            None => Ok(None),
        }
    }

    fn entry_params(entry: &Entry) -> Vec<Value> {
        vec![
            Value::Text(entry.game_id.to_string()),
            entry
                .display_name
                .clone()
                .map_or(Value::Null, Value::Text),
            Value::Integer(entry.added_at.timestamp_millis()),
            entry
                .last_checked_at
                .map_or(Value::Null, |checked| Value::Integer(checked.timestamp_millis())),
        ]
    }

    /// Parse an entry from a database row, skipping rows with an invalid key
    fn parse_entry(row: &libsql::Row) -> Result<Option<Entry>> {
        let raw_id: String = row.get(0)?;
        let Ok(game_id) = GameId::parse(&raw_id) else {
            tracing::warn!(game_id = %raw_id, "Skipping primary row with invalid game id");
            return Ok(None);
        };
        let display_name = match row.get_value(1)? {
            Value::Text(name) => Some(name),
            _ => None,
        };
        let added_at = util::from_millis(row.get::<i64>(2)?);
        let last_checked_at = match row.get_value(3)? {
            Value::Integer(checked) => Some(util::from_millis(checked)),
            _ => None,
        };

        let mut entry = Entry {
            game_id,
            display_name,
            added_at,
            last_checked_at,
        };
        entry.normalize();
        Ok(Some(entry))
    }

    async fn write_all(conn: &Connection, snapshot: &Snapshot) -> Result<()> {
        conn.execute("DELETE FROM whitelist_entries", ()).await?;
        for entry in &snapshot.entries {
            conn.execute(
                "INSERT INTO whitelist_entries (game_id, display_name, added_at, last_checked_at)
                 VALUES (?1, ?2, ?3, ?4)",
                Self::entry_params(entry),
            )
            .await?;
        }
        conn.execute(
            "INSERT INTO registry_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            vec![
                Value::Text(SAVED_AT_KEY.to_string()),
                Value::Integer(snapshot.saved_at.timestamp_millis()),
            ],
        )
        .await?;
        Ok(())
    }
}

impl PrimaryBackend for LibSqlBackend {
    fn describe(&self) -> String {
        self.config.describe()
    }

    async fn connect(&self) -> Result<()> {
        let mut guard = self.db.lock().await;
        if guard.is_none() {
            tracing::debug!(target_db = %self.config.describe(), "Opening primary backend");
            *guard = Some(Database::open(&self.config).await?);
        }
        let db = guard.as_ref().ok_or_else(Self::not_connected)?;
        db.ping().await
    }

    async fn disconnect(&self) {
        // An in-memory database would lose its contents if dropped.
        if self.config.is_memory() {
            return;
        }
        if self.db.lock().await.take().is_some() {
            tracing::debug!(target_db = %self.config.describe(), "Dropped primary connection");
        }
    }

    async fn load_snapshot(&self) -> Result<Snapshot> {
        let guard = self.db.lock().await;
        let conn = guard.as_ref().ok_or_else(Self::not_connected)?.connection();

        let mut rows = conn
            .query(
                "SELECT game_id, display_name, added_at, last_checked_at
                 FROM whitelist_entries
                 ORDER BY added_at DESC, game_id ASC",
                (),
            )
            .await?;

        let mut snapshot = Snapshot::empty(DateTime::default());
        while let Some(row) = rows.next().await? {
            if let Some(entry) = Self::parse_entry(&row)? {
                snapshot.insert(entry);
            }
        }

        if let Some(saved_at) = Self::read_saved_at(conn).await? {
            snapshot.saved_at = saved_at;
        }
        Ok(snapshot)
    }

    async fn insert_entry(&self, entry: &Entry, saved_at: DateTime<Utc>) -> Result<bool> {
        let guard = self.db.lock().await;
        let conn = guard.as_ref().ok_or_else(Self::not_connected)?.connection();

        let inserted = conn
            .execute(
                "INSERT INTO whitelist_entries (game_id, display_name, added_at, last_checked_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(game_id) DO NOTHING",
                Self::entry_params(entry),
            )
            .await?;
        if inserted == 0 {
            return Ok(false);
        }

        Self::set_saved_at(conn, saved_at).await?;
        Ok(true)
    }

    async fn update_entry(&self, entry: &Entry, saved_at: DateTime<Utc>) -> Result<bool> {
        let guard = self.db.lock().await;
        let conn = guard.as_ref().ok_or_else(Self::not_connected)?.connection();

        let updated = conn
            .execute(
                "UPDATE whitelist_entries
                 SET display_name = ?2, last_checked_at = ?3
                 WHERE game_id = ?1",
                vec![
                    Value::Text(entry.game_id.to_string()),
                    entry.display_name.clone().map_or(Value::Null, Value::Text),
                    entry
                        .last_checked_at
                        .map_or(Value::Null, |checked| Value::Integer(checked.timestamp_millis())),
                ],
            )
            .await?;
        if updated == 0 {
            return Ok(false);
        }

        Self::set_saved_at(conn, saved_at).await?;
        Ok(true)
    }

    async fn delete_entry(&self, game_id: &GameId, saved_at: DateTime<Utc>) -> Result<bool> {
        let guard = self.db.lock().await;
        let conn = guard.as_ref().ok_or_else(Self::not_connected)?.connection();

        let deleted = conn
            .execute(
                "DELETE FROM whitelist_entries WHERE game_id = ?1",
                vec![Value::Text(game_id.to_string())],
            )
            .await?;
        if deleted == 0 {
            return Ok(false);
        }

        Self::set_saved_at(conn, saved_at).await?;
        Ok(true)
    }

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()> {
        let guard = self.db.lock().await;
        let conn = guard.as_ref().ok_or_else(Self::not_connected)?.connection();

        conn.execute("BEGIN TRANSACTION", ()).await?;
        if let Err(e) = Self::write_all(conn, snapshot).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }
        if let Err(e) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        tracing::debug!(entries = snapshot.len(), "Replaced primary collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn setup() -> LibSqlBackend {
        let backend = LibSqlBackend::new(BackendConfig::Memory);
        backend.connect().await.unwrap();
        backend
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn entry(id: &str, added: i64) -> Entry {
        Entry::new(GameId::parse(id).unwrap(), Some(format!("Game {id}")), ts(added))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_operations_require_connect() {
        let backend = LibSqlBackend::new(BackendConfig::Memory);
        assert!(matches!(
            backend.load_snapshot().await,
            Err(Error::Database(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fresh_backend_is_empty() {
        let backend = setup().await;
        let snapshot = backend.load_snapshot().await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.saved_at, DateTime::<Utc>::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_load() {
        let backend = setup().await;
        assert!(backend.insert_entry(&entry("1", 10), ts(10)).await.unwrap());
        assert!(backend.insert_entry(&entry("2", 20), ts(20)).await.unwrap());

        let snapshot = backend.load_snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.entries[0].game_id.as_str(), "2");
        assert_eq!(snapshot.entries[1].display_name.as_deref(), Some("Game 1"));
        assert_eq!(snapshot.saved_at, ts(20));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_duplicate_is_rejected() {
        let backend = setup().await;
        assert!(backend.insert_entry(&entry("1", 10), ts(10)).await.unwrap());
        assert!(!backend.insert_entry(&entry("1", 11), ts(11)).await.unwrap());

        let snapshot = backend.load_snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries[0].added_at, ts(10));
        assert_eq!(snapshot.saved_at, ts(10));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_records_check_and_name() {
        let backend = setup().await;
        let mut stored = entry("1", 10);
        backend.insert_entry(&stored, ts(10)).await.unwrap();

        stored.record_check(ts(50));
        stored.rename(Some("Renamed".into()));
        assert!(backend.update_entry(&stored, ts(50)).await.unwrap());

        let snapshot = backend.load_snapshot().await.unwrap();
        assert_eq!(snapshot.entries[0], stored);
        assert_eq!(snapshot.saved_at, ts(50));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_absent_entry_returns_false() {
        let backend = setup().await;
        assert!(!backend.update_entry(&entry("9", 1), ts(1)).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_entry() {
        let backend = setup().await;
        backend.insert_entry(&entry("1", 10), ts(10)).await.unwrap();

        assert!(backend
            .delete_entry(&GameId::parse("1").unwrap(), ts(30))
            .await
            .unwrap());
        assert!(!backend
            .delete_entry(&GameId::parse("1").unwrap(), ts(40))
            .await
            .unwrap());

        let snapshot = backend.load_snapshot().await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.saved_at, ts(30));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replace_all_overwrites_collection_and_clock() {
        let backend = setup().await;
        backend.insert_entry(&entry("a", 10), ts(100)).await.unwrap();

        let mut replacement = Snapshot::empty(ts(50));
        replacement.insert(entry("b", 20));
        backend.replace_all(&replacement).await.unwrap();

        let snapshot = backend.load_snapshot().await.unwrap();
        assert_eq!(snapshot, replacement);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_memory_backend_survives_disconnect() {
        let backend = setup().await;
        backend.insert_entry(&entry("1", 10), ts(10)).await.unwrap();
        backend.disconnect().await;
        backend.connect().await.unwrap();
        assert_eq!(backend.load_snapshot().await.unwrap().len(), 1);
    }
}
