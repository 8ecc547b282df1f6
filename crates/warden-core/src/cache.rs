//! Local snapshot cache
//!
//! The always-available fallback store. It holds exactly one full snapshot and
//! trusts whatever it is given: key uniqueness is enforced by the registry
//! before `save` is called.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::Snapshot;
use crate::util;

/// Load-whole / save-whole storage for one snapshot
pub trait SnapshotCache: Send + Sync {
    /// Last persisted snapshot, or an empty one stamped now when nothing was saved yet
    fn load(&self) -> Result<Snapshot>;

    /// Persist the snapshot atomically
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Human-readable location, used in logs and health output
    fn describe(&self) -> String;
}

/// JSON file cache with write-new-then-rename replacement.
///
/// A reader never sees a half-written file: the snapshot is written and
/// fsynced to a sibling temp file, then renamed over the target.
pub struct FileCache {
    path: PathBuf,
    temp_path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut temp_name = path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);
        Self { path, temp_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move an unreadable cache file aside so the next save starts clean.
    fn quarantine_corrupt(&self) -> Result<PathBuf> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut backup_name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        backup_name.push(format!(".corrupt-{timestamp}"));
        let backup_path = self.path.with_file_name(backup_name);

        fs::rename(&self.path, &backup_path)?;
        tracing::warn!(
            "Moved corrupted cache file from {} to {}",
            self.path.display(),
            backup_path.display()
        );
        Ok(backup_path)
    }
}

impl SnapshotCache for FileCache {
    fn load(&self) -> Result<Snapshot> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cache file at {}, starting empty", self.path.display());
                return Ok(Snapshot::empty(util::now()));
            }
            Err(error) => return Err(error.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snapshot::empty(util::now()));
        }

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(mut snapshot) => {
                let dropped = snapshot.normalize();
                if dropped > 0 {
                    tracing::warn!(dropped, "Dropped duplicate entries from cache file");
                }
                tracing::debug!(
                    entries = snapshot.len(),
                    "Loaded cache from {}",
                    self.path.display()
                );
                Ok(snapshot)
            }
            Err(error) => {
                tracing::warn!("Cache file {} is unreadable: {error}", self.path.display());
                self.quarantine_corrupt()?;
                Ok(Snapshot::empty(util::now()))
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_vec_pretty(snapshot)?;
        let write_temp = || -> std::io::Result<()> {
            let mut file = File::create(&self.temp_path)?;
            file.write_all(&payload)?;
            file.sync_all()
        };
        if let Err(error) = write_temp() {
            fs::remove_file(&self.temp_path).ok();
            return Err(Error::Persistence(format!(
                "failed to write {}: {error}",
                self.temp_path.display()
            )));
        }

        fs::rename(&self.temp_path, &self.path).map_err(|error| {
            Error::Persistence(format!(
                "failed to replace {}: {error}",
                self.path.display()
            ))
        })?;

        tracing::debug!(
            entries = snapshot.len(),
            "Saved cache to {}",
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Process-lifetime cache for deployments without a writable disk
#[derive(Default)]
pub struct MemoryCache {
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Snapshot>> {
        self.snapshot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SnapshotCache for MemoryCache {
    fn load(&self) -> Result<Snapshot> {
        Ok(self
            .slot()
            .clone()
            .unwrap_or_else(|| Snapshot::empty(util::now())))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.slot() = Some(snapshot.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, GameId};
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample() -> Snapshot {
        let added = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut snapshot = Snapshot::empty(added);
        snapshot.insert(Entry::new(
            GameId::parse("100").unwrap(),
            Some("Game A".into()),
            added,
        ));
        snapshot
    }

    #[test]
    fn missing_file_loads_empty_snapshot() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("whitelist.json"));
        let snapshot = cache.load().unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn save_then_load_returns_same_snapshot() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested").join("whitelist.json"));
        let snapshot = sample();

        cache.save(&snapshot).unwrap();
        assert_eq!(cache.load().unwrap(), snapshot);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("whitelist.json"));
        cache.save(&sample()).unwrap();

        assert!(cache.path().exists());
        assert!(!dir.path().join("whitelist.json.tmp").exists());
    }

    #[test]
    fn stale_temp_file_does_not_shadow_last_good_snapshot() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("whitelist.json"));
        let snapshot = sample();
        cache.save(&snapshot).unwrap();

        // Simulate a crash between writing the temp file and the rename.
        std::fs::write(dir.path().join("whitelist.json.tmp"), b"{\"entr").unwrap();

        assert_eq!(cache.load().unwrap(), snapshot);
        cache.save(&snapshot).unwrap();
        assert_eq!(cache.load().unwrap(), snapshot);
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        std::fs::write(&path, b"not json").unwrap();

        let cache = FileCache::new(&path);
        assert!(cache.load().unwrap().is_empty());
        assert!(!path.exists());

        let quarantined = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .any(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("whitelist.json.corrupt-")
            });
        assert!(quarantined);
    }

    #[test]
    fn memory_cache_round_trips() {
        let cache = MemoryCache::new();
        assert!(cache.load().unwrap().is_empty());
        cache.save(&sample()).unwrap();
        assert_eq!(cache.load().unwrap(), sample());
    }
}
