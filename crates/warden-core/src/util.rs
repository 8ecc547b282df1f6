//! Shared utility functions used across multiple modules.

use chrono::{DateTime, SubsecRound, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current wall-clock time at millisecond precision.
///
/// The primary backend stores Unix milliseconds, so every timestamp produced
/// in-process is truncated to the same precision to keep comparisons stable
/// across a round-trip.
pub fn now() -> DateTime<Utc> {
    to_millis_precision(Utc::now())
}

/// Drop sub-millisecond precision from a timestamp received from outside.
pub fn to_millis_precision(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(3)
}

/// Convert a stored Unix millisecond value back into a timestamp.
pub fn from_millis(value: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some("  Game A ".to_string())),
            Some("Game A".to_string())
        );
    }

    #[test]
    fn now_has_millisecond_precision() {
        let stamp = now();
        assert_eq!(from_millis(stamp.timestamp_millis()), stamp);
    }

    #[test]
    fn to_millis_precision_survives_millisecond_round_trip() {
        let precise = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let truncated = to_millis_precision(precise);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(from_millis(truncated.timestamp_millis()), truncated);
    }

    #[test]
    fn compact_text_limits_length() {
        let long = "x".repeat(500);
        assert_eq!(compact_text(&long).len(), 180);
    }
}
