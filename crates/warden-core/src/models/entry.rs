//! Whitelist entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::util::{normalize_text_option, to_millis_precision};

/// Longest accepted game identifier, in characters.
pub const MAX_GAME_ID_LEN: usize = 64;

/// External identifier of a game server; the registry's natural key.
///
/// Always trimmed, non-empty, at most [`MAX_GAME_ID_LEN`] characters and free
/// of control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameId(String);

impl GameId {
    /// Validate and wrap a raw identifier.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("game id must not be empty".into()));
        }
        if trimmed.chars().count() > MAX_GAME_ID_LEN {
            return Err(Error::InvalidInput(format!(
                "game id must be at most {MAX_GAME_ID_LEN} characters"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(Error::InvalidInput(
                "game id must not contain control characters".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GameId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GameId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GameId> for String {
    fn from(value: GameId) -> Self {
        value.0
    }
}

impl PartialEq<str> for GameId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// One whitelisted game server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Natural key, immutable once created
    pub game_id: GameId,
    /// Optional human-readable label
    #[serde(default, alias = "gameName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Creation timestamp
    pub added_at: DateTime<Utc>,
    /// Last successful membership check
    #[serde(default, alias = "lastCheck", skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Create a new entry added at `now`
    #[must_use]
    pub fn new(game_id: GameId, display_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            game_id,
            display_name: normalize_text_option(display_name),
            added_at: now,
            last_checked_at: None,
        }
    }

    /// Record a successful check.
    ///
    /// `last_checked_at` never moves backwards and never precedes `added_at`.
    pub fn record_check(&mut self, now: DateTime<Utc>) {
        let floor = self.last_checked_at.unwrap_or(self.added_at);
        self.last_checked_at = Some(now.max(floor));
    }

    /// Replace the display name; blank names clear it.
    pub fn rename(&mut self, display_name: Option<String>) {
        self.display_name = normalize_text_option(display_name);
    }

    /// Repair invariants on data that did not originate here.
    pub(crate) fn normalize(&mut self) {
        self.display_name = normalize_text_option(self.display_name.take());
        self.added_at = to_millis_precision(self.added_at);
        self.last_checked_at = self.last_checked_at.map(to_millis_precision);
        if let Some(checked) = self.last_checked_at {
            if checked < self.added_at {
                self.last_checked_at = Some(self.added_at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn game_id_trims_whitespace() {
        let id = GameId::parse("  12345 ").unwrap();
        assert_eq!(id.as_str(), "12345");
    }

    #[test]
    fn game_id_rejects_empty_and_blank() {
        assert!(matches!(GameId::parse(""), Err(Error::InvalidInput(_))));
        assert!(matches!(GameId::parse("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn game_id_rejects_control_characters() {
        assert!(GameId::parse("12\n34").is_err());
    }

    #[test]
    fn game_id_rejects_overlong_values() {
        let long = "9".repeat(MAX_GAME_ID_LEN + 1);
        assert!(GameId::parse(&long).is_err());
        assert!(GameId::parse(&"9".repeat(MAX_GAME_ID_LEN)).is_ok());
    }

    #[test]
    fn entry_new_normalizes_display_name() {
        let entry = Entry::new(GameId::parse("1").unwrap(), Some("  ".into()), ts(10));
        assert_eq!(entry.display_name, None);
        assert_eq!(entry.last_checked_at, None);
    }

    #[test]
    fn record_check_is_monotonic() {
        let mut entry = Entry::new(GameId::parse("1").unwrap(), None, ts(100));
        entry.record_check(ts(200));
        assert_eq!(entry.last_checked_at, Some(ts(200)));

        // A clock step backwards must not regress the check time.
        entry.record_check(ts(150));
        assert_eq!(entry.last_checked_at, Some(ts(200)));
    }

    #[test]
    fn record_check_never_precedes_added_at() {
        let mut entry = Entry::new(GameId::parse("1").unwrap(), None, ts(100));
        entry.record_check(ts(100) - Duration::seconds(30));
        assert_eq!(entry.last_checked_at, Some(ts(100)));
    }

    #[test]
    fn entry_accepts_legacy_field_names() {
        let json = r#"{
            "gameId": "777",
            "gameName": "Legacy Game",
            "addedAt": "2024-03-01T10:00:00.000Z",
            "lastCheck": "2024-03-02T10:00:00.000Z"
        }"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.game_id.as_str(), "777");
        assert_eq!(entry.display_name.as_deref(), Some("Legacy Game"));
        assert!(entry.last_checked_at.is_some());
    }

    #[test]
    fn entry_serializes_camel_case_without_empty_optionals() {
        let entry = Entry::new(GameId::parse("42").unwrap(), None, ts(0));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"gameId\":\"42\""));
        assert!(json.contains("\"addedAt\""));
        assert!(!json.contains("displayName"));
        assert!(!json.contains("lastCheckedAt"));
    }

    #[test]
    fn entry_rejects_invalid_game_id_on_deserialize() {
        let json = r#"{"gameId": "  ", "addedAt": "2024-03-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<Entry>(json).is_err());
    }
}
