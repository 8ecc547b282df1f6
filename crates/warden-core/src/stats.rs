//! Summary counters derived from a snapshot

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Snapshot;

/// Window in which a check counts as recent.
pub const RECENT_CHECK_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub with_last_check: usize,
    pub recent_checks: usize,
}

/// Compute counters for `snapshot` as of `now`.
///
/// A check exactly at the window boundary is not recent.
pub fn compute(snapshot: &Snapshot, now: DateTime<Utc>) -> RegistryStats {
    let cutoff = now - Duration::hours(RECENT_CHECK_WINDOW_HOURS);
    let mut stats = RegistryStats {
        total: snapshot.len(),
        ..RegistryStats::default()
    };

    for checked in snapshot
        .entries
        .iter()
        .filter_map(|entry| entry.last_checked_at)
    {
        stats.with_last_check += 1;
        if checked > cutoff {
            stats.recent_checks += 1;
        }
    }

    stats
}
