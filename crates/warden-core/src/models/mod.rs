//! Data models for Warden

mod entry;
mod snapshot;

pub use entry::{Entry, GameId, MAX_GAME_ID_LEN};
pub use snapshot::Snapshot;
