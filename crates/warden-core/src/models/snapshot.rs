//! Collection snapshot model

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Entry, GameId};
use crate::util::to_millis_precision;

/// The whole registry collection, persisted and reconciled as one unit.
///
/// `saved_at` is the collection-level clock used for last-write-wins
/// reconciliation; it is bumped by every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, alias = "servers")]
    pub entries: Vec<Entry>,
    #[serde(alias = "lastSaved")]
    pub saved_at: DateTime<Utc>,
}

impl Snapshot {
    /// An empty collection stamped with `now`
    #[must_use]
    pub const fn empty(now: DateTime<Utc>) -> Self {
        Self {
            entries: Vec::new(),
            saved_at: now,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, game_id: &GameId) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.game_id == *game_id)
    }

    pub fn get_mut(&mut self, game_id: &GameId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|entry| entry.game_id == *game_id)
    }

    pub fn contains(&self, game_id: &GameId) -> bool {
        self.get(game_id).is_some()
    }

    /// Append an entry unless its key is already present.
    ///
    /// Returns `false` and leaves the snapshot untouched on a duplicate key.
    pub fn insert(&mut self, entry: Entry) -> bool {
        if self.contains(&entry.game_id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Remove and return the entry with the given key.
    pub fn remove(&mut self, game_id: &GameId) -> Option<Entry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.game_id == *game_id)?;
        Some(self.entries.remove(index))
    }

    /// Bump the collection clock after a mutation.
    ///
    /// The clock strictly advances even when `now` lags behind it, so two
    /// mutations within the same millisecond still order correctly.
    pub fn mark_saved(&mut self, now: DateTime<Utc>) {
        self.saved_at = if now > self.saved_at {
            now
        } else {
            self.saved_at + Duration::milliseconds(1)
        };
    }

    /// Copy sorted for display: newest `added_at` first, ties by key.
    #[must_use]
    pub fn sorted_for_display(&self) -> Self {
        let mut sorted = self.clone();
        sorted.entries.sort_by(|a, b| {
            b.added_at
                .cmp(&a.added_at)
                .then_with(|| a.game_id.cmp(&b.game_id))
        });
        sorted
    }

    /// Enforce key uniqueness and per-entry invariants on an external snapshot.
    ///
    /// The first occurrence of a duplicated key wins. Returns the number of
    /// dropped duplicates. Timestamps are cut to millisecond precision to match
    /// what the primary backend can store.
    pub fn normalize(&mut self) -> usize {
        self.saved_at = to_millis_precision(self.saved_at);
        let before = self.entries.len();
        let mut seen = HashSet::with_capacity(before);
        self.entries
            .retain(|entry| seen.insert(entry.game_id.clone()));
        for entry in &mut self.entries {
            entry.normalize();
        }
        before - self.entries.len()
    }
}
