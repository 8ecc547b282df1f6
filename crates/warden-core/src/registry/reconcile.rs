//! Whole-collection last-write-wins reconciliation

use crate::db::PrimaryBackend;
use crate::models::Snapshot;

use super::outcome::{Applied, SyncOutcome};
use super::{Change, PrimaryWrite, RegistryStore};

/// Which side of a reconciliation keeps its collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Current,
    Incoming,
}

/// Incoming wins only when its clock is strictly newer; ties keep the current side.
pub fn newer_wins(current: &Snapshot, incoming: &Snapshot) -> Winner {
    if incoming.saved_at > current.saved_at {
        Winner::Incoming
    } else {
        Winner::Current
    }
}

fn prepare(mut incoming: Snapshot) -> Snapshot {
    let dropped = incoming.normalize();
    if dropped > 0 {
        tracing::warn!(dropped, "Dropped duplicate entries from incoming snapshot");
    }
    incoming
}

impl<B: PrimaryBackend> RegistryStore<B> {
    /// Replace the collection with `incoming` when it is newer
    pub async fn sync(&self, incoming: Snapshot) -> Applied<SyncOutcome> {
        let incoming = prepare(incoming);

        self.mutate(move |snapshot, _now| match newer_wins(snapshot, &incoming) {
            Winner::Incoming => {
                tracing::info!(
                    entries = incoming.len(),
                    saved_at = %incoming.saved_at,
                    "Accepted newer snapshot"
                );
                *snapshot = incoming;
                Change::Changed {
                    outcome: SyncOutcome {
                        snapshot: snapshot.sorted_for_display(),
                        changed: true,
                    },
                    write: PrimaryWrite::ReplaceAll,
                }
            }
            Winner::Current => {
                tracing::debug!(
                    incoming_saved_at = %incoming.saved_at,
                    current_saved_at = %snapshot.saved_at,
                    "Ignored stale snapshot"
                );
                Change::Unchanged(SyncOutcome {
                    snapshot: snapshot.sorted_for_display(),
                    changed: false,
                })
            }
        })
        .await
    }

    /// Replace the collection with `incoming` unconditionally
    pub async fn import(&self, incoming: Snapshot) -> Applied<SyncOutcome> {
        let mut incoming = prepare(incoming);

        self.mutate(move |snapshot, now| {
            incoming.saved_at = snapshot.saved_at;
            incoming.mark_saved(now);
            tracing::info!(entries = incoming.len(), "Imported snapshot");
            *snapshot = incoming;
            Change::Changed {
                outcome: SyncOutcome {
                    snapshot: snapshot.sorted_for_display(),
                    changed: true,
                },
                write: PrimaryWrite::ReplaceAll,
            }
        })
        .await
    }

    /// The current collection in display order
    pub async fn export(&self) -> Snapshot {
        self.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn strictly_newer_incoming_wins() {
        let current = Snapshot::empty(DateTime::from_timestamp(100, 0).unwrap());
        let newer = Snapshot::empty(DateTime::from_timestamp(101, 0).unwrap());
        let older = Snapshot::empty(DateTime::from_timestamp(99, 0).unwrap());

        assert_eq!(newer_wins(&current, &newer), Winner::Incoming);
        assert_eq!(newer_wins(&current, &older), Winner::Current);
        assert_eq!(newer_wins(&current, &current.clone()), Winner::Current);
    }
}
