//! Whitelist registry with primary/local fallback persistence
//!
//! Every mutating call asks the connector for the primary first. When it is
//! reachable the change is written there and mirrored into the local cache;
//! otherwise it lands in the local cache only and the collection is flagged
//! as pending reconciliation. The next successful connection picks a winner
//! by last-write-wins on `saved_at`.

mod outcome;
mod reconcile;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::cache::SnapshotCache;
use crate::connector::{BackendConnector, DEFAULT_CONNECT_TIMEOUT};
use crate::db::PrimaryBackend;
use crate::error::Result;
use crate::models::{Entry, GameId, Snapshot};
use crate::state::{ConnectionMode, DataSource};
use crate::stats::{self, RegistryStats};
use crate::util;

pub use outcome::{
    AddOutcome, Applied, CheckOutcome, ConnectionInfo, RemoveOutcome, RenameOutcome, SyncOutcome,
};
pub use reconcile::{newer_wins, Winner};

/// Construction-time knobs for [`RegistryStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    pub connect_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl RegistryOptions {
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// What an operation did to the working snapshot
pub(crate) enum Change<T> {
    Unchanged(T),
    Changed { outcome: T, write: PrimaryWrite },
}

/// The primary-side counterpart of a snapshot change
pub(crate) enum PrimaryWrite {
    Insert(Entry),
    Update(Entry),
    Delete(GameId),
    ReplaceAll,
}

#[derive(Default)]
struct WriterState {
    /// The published view reflects the primary since the last successful connect
    attached: bool,
    /// The first successful connection has happened
    bootstrapped: bool,
}

/// Authoritative registry view shared by handle across the process
pub struct RegistryStore<B> {
    connector: BackendConnector<B>,
    cache: Box<dyn SnapshotCache>,
    writer: Mutex<WriterState>,
    published: RwLock<Snapshot>,
    pending: AtomicBool,
}

impl<B: PrimaryBackend> RegistryStore<B> {
    /// Build a store over `backend`, starting from whatever the cache holds
    ///
    /// No connection is attempted until the first call.
    pub fn new(
        backend: B,
        cache: Box<dyn SnapshotCache>,
        options: RegistryOptions,
    ) -> Result<Self> {
        let snapshot = cache.load()?;
        tracing::info!(
            entries = snapshot.len(),
            cache = %cache.describe(),
            primary = %backend.describe(),
            "Registry opened"
        );

        Ok(Self {
            connector: BackendConnector::new(backend, options.connect_timeout),
            cache,
            writer: Mutex::new(WriterState::default()),
            // An empty cache holds nothing worth pushing over the primary.
            pending: AtomicBool::new(!snapshot.is_empty()),
            published: RwLock::new(snapshot),
        })
    }

    pub const fn connector(&self) -> &BackendConnector<B> {
        &self.connector
    }

    /// Whitelist a game
    pub async fn add(
        &self,
        game_id: &str,
        display_name: Option<String>,
    ) -> Result<Applied<AddOutcome>> {
        let game_id = GameId::parse(game_id)?;

        let applied = self
            .mutate(move |snapshot, now| {
                if snapshot.contains(&game_id) {
                    return Change::Unchanged(AddOutcome::AlreadyExists);
                }
                let entry = Entry::new(game_id, display_name, now);
                snapshot.insert(entry.clone());
                snapshot.mark_saved(now);
                Change::Changed {
                    outcome: AddOutcome::Created(entry.clone()),
                    write: PrimaryWrite::Insert(entry),
                }
            })
            .await;
        Ok(applied)
    }

    /// Remove a game from the whitelist
    pub async fn remove(&self, game_id: &str) -> Result<Applied<RemoveOutcome>> {
        let game_id = GameId::parse(game_id)?;

        let applied = self
            .mutate(move |snapshot, now| match snapshot.remove(&game_id) {
                Some(entry) => {
                    snapshot.mark_saved(now);
                    Change::Changed {
                        outcome: RemoveOutcome::Removed(entry),
                        write: PrimaryWrite::Delete(game_id),
                    }
                }
                None => Change::Unchanged(RemoveOutcome::NotFound),
            })
            .await;
        Ok(applied)
    }

    /// Look a game up, recording the check time when it is whitelisted
    pub async fn check(&self, game_id: &str) -> Result<Applied<CheckOutcome>> {
        let game_id = GameId::parse(game_id)?;
        let key = game_id.clone();

        let applied = self
            .mutate(move |snapshot, now| {
                let Some(entry) = snapshot.get_mut(&game_id) else {
                    return Change::Unchanged(CheckOutcome::NotFound);
                };
                entry.record_check(now);
                let entry = entry.clone();
                snapshot.mark_saved(now);
                Change::Changed {
                    outcome: CheckOutcome::Found(entry.clone()),
                    write: PrimaryWrite::Update(entry),
                }
            })
            .await;

        tracing::debug!(
            game_id = %key,
            whitelisted = applied.outcome.is_whitelisted(),
            source = ?applied.source,
            "Checked game"
        );
        Ok(applied)
    }

    /// Replace a game's display name; blank clears it
    pub async fn rename(
        &self,
        game_id: &str,
        display_name: Option<String>,
    ) -> Result<Applied<RenameOutcome>> {
        let game_id = GameId::parse(game_id)?;

        let applied = self
            .mutate(move |snapshot, now| {
                let Some(entry) = snapshot.get_mut(&game_id) else {
                    return Change::Unchanged(RenameOutcome::NotFound);
                };
                entry.rename(display_name);
                let entry = entry.clone();
                snapshot.mark_saved(now);
                Change::Changed {
                    outcome: RenameOutcome::Renamed(entry.clone()),
                    write: PrimaryWrite::Update(entry),
                }
            })
            .await;
        Ok(applied)
    }

    /// Remove every entry; the outcome is the number removed
    pub async fn clear(&self) -> Applied<usize> {
        self.mutate(|snapshot, now| {
            if snapshot.is_empty() {
                return Change::Unchanged(0);
            }
            let removed = snapshot.len();
            snapshot.entries.clear();
            snapshot.mark_saved(now);
            Change::Changed {
                outcome: removed,
                write: PrimaryWrite::ReplaceAll,
            }
        })
        .await
    }

    /// Re-read the primary into the published view when it is reachable
    pub async fn refresh(&self) -> DataSource {
        self.mutate(|_, _| Change::Unchanged(())).await.source
    }

    /// Published collection, newest first
    pub async fn list(&self) -> Snapshot {
        self.published.read().await.sorted_for_display()
    }

    pub async fn stats(&self) -> RegistryStats {
        stats::compute(&*self.published.read().await, util::now())
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        let connector = self.connector.status();
        let mode = if connector.healthy {
            ConnectionMode::Primary
        } else {
            ConnectionMode::LocalFallback
        };

        ConnectionInfo {
            mode,
            pending_reconciliation: self.is_pending(),
            primary_target: self.connector.backend().describe(),
            cache_location: self.cache.describe(),
            connector,
        }
    }

    /// Run `op` against the freshest reachable snapshot, persist and publish the result
    pub(crate) async fn mutate<T, F>(&self, op: F) -> Applied<T>
    where
        F: FnOnce(&mut Snapshot, DateTime<Utc>) -> Change<T>,
    {
        let mut state = self.writer.lock().await;
        let (mut snapshot, mut source) = self.working_snapshot(&mut state).await;
        let diverged = snapshot != *self.published.read().await;

        let (outcome, write) = match op(&mut snapshot, util::now()) {
            Change::Unchanged(outcome) => (outcome, None),
            Change::Changed { outcome, write } => (outcome, Some(write)),
        };

        if let Some(write) = &write {
            match source {
                DataSource::Primary => {
                    if let Err(error) = self.write_primary(write, &snapshot).await {
                        self.connector.mark_unhealthy(&error.to_string()).await;
                        state.attached = false;
                        self.pending.store(true, Ordering::Release);
                        source = DataSource::LocalCache;
                    }
                }
                DataSource::LocalCache => self.pending.store(true, Ordering::Release),
            }
        }

        let mut warning = None;
        if write.is_some() || diverged {
            if let Err(error) = self.cache.save(&snapshot) {
                tracing::warn!(%error, cache = %self.cache.describe(), "Failed to persist local cache");
                warning = Some(format!("local cache not updated: {error}"));
            }
        }

        *self.published.write().await = snapshot;
        Applied {
            outcome,
            source,
            warning,
        }
    }

    /// Snapshot the next operation should start from, and which store it came from
    async fn working_snapshot(&self, state: &mut WriterState) -> (Snapshot, DataSource) {
        if !self.connector.connect().await.is_healthy() {
            state.attached = false;
            return (self.published.read().await.clone(), DataSource::LocalCache);
        }

        let loaded = if state.attached {
            self.connector.backend().load_snapshot().await
        } else {
            self.attach(state).await
        };

        match loaded {
            Ok(snapshot) => {
                state.attached = true;
                (snapshot, DataSource::Primary)
            }
            Err(error) => {
                self.connector.mark_unhealthy(&error.to_string()).await;
                state.attached = false;
                (self.published.read().await.clone(), DataSource::LocalCache)
            }
        }
    }

    /// Reconcile the published view with the primary after (re)connecting
    async fn attach(&self, state: &mut WriterState) -> Result<Snapshot> {
        let backend = self.connector.backend();
        let local = self.published.read().await.clone();
        let remote = backend.load_snapshot().await?;

        let adopted = if !state.bootstrapped && remote.is_empty() {
            tracing::info!(entries = local.len(), "Seeding empty primary from local cache");
            backend.replace_all(&local).await?;
            local
        } else if self.is_pending() && newer_wins(&remote, &local) == Winner::Incoming {
            tracing::info!(entries = local.len(), "Pushing newer local changes to primary");
            backend.replace_all(&local).await?;
            local
        } else {
            tracing::debug!(entries = remote.len(), "Adopted primary snapshot");
            remote
        };

        state.bootstrapped = true;
        self.pending.store(false, Ordering::Release);
        Ok(adopted)
    }

    async fn write_primary(&self, write: &PrimaryWrite, snapshot: &Snapshot) -> Result<()> {
        let backend = self.connector.backend();
        let applied = match write {
            PrimaryWrite::Insert(entry) => backend.insert_entry(entry, snapshot.saved_at).await?,
            PrimaryWrite::Update(entry) => backend.update_entry(entry, snapshot.saved_at).await?,
            PrimaryWrite::Delete(game_id) => backend.delete_entry(game_id, snapshot.saved_at).await?,
            PrimaryWrite::ReplaceAll => {
                backend.replace_all(snapshot).await?;
                true
            }
        };
        if !applied {
            // Another writer got there between our load and write; the next
            // reload picks up whatever the primary now holds.
            tracing::warn!("Primary write affected no rows");
        }
        Ok(())
    }
}
