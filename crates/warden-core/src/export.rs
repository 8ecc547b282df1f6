//! Snapshot export and import helpers shared by the API and CLI.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Snapshot;

/// Written into every JSON export; ignored on import.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Export output format shared by all clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// JSON export envelope: the snapshot plus provenance fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub version: &'static str,
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: &'a Snapshot,
}

impl<'a> ExportDocument<'a> {
    pub const fn new(snapshot: &'a Snapshot, exported_at: DateTime<Utc>) -> Self {
        Self {
            version: EXPORT_FORMAT_VERSION,
            exported_at,
            snapshot,
        }
    }
}

/// Render a snapshot as pretty-printed JSON.
pub fn render_json_export(
    snapshot: &Snapshot,
    exported_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportDocument::new(snapshot, exported_at))
}

/// Render a snapshot as a Markdown table.
#[must_use]
pub fn render_markdown_export(snapshot: &Snapshot) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Whitelist");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Saved at {} ({} entries)",
        format_timestamp(snapshot.saved_at),
        snapshot.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "| Game ID | Name | Added | Last check |");
    let _ = writeln!(output, "|---|---|---|---|");

    for entry in &snapshot.entries {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            escape_cell(entry.game_id.as_str()),
            entry.display_name.as_deref().map_or_else(String::new, escape_cell),
            format_timestamp(entry.added_at),
            entry
                .last_checked_at
                .map_or_else(|| "never".to_string(), format_timestamp),
        );
    }

    output
}

/// Render a snapshot based on selected export format.
pub fn render_snapshot_export(
    snapshot: &Snapshot,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(snapshot, exported_at),
        ExportFormat::Markdown => Ok(render_markdown_export(snapshot)),
    }
}

/// Parse an exported or hand-written snapshot, accepting the legacy field names.
pub fn parse_snapshot_json(input: &str) -> Result<Snapshot> {
    let mut snapshot: Snapshot = serde_json::from_str(input)?;
    snapshot.normalize();
    Ok(snapshot)
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("warden-export-{timestamp_ms}.{}", format.extension())
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, GameId};

    fn sample() -> Snapshot {
        let added = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut snapshot = Snapshot::empty(added);
        let mut entry = Entry::new(GameId::parse("100").unwrap(), Some("A|B".into()), added);
        entry.record_check(added);
        snapshot.insert(entry);
        snapshot.insert(Entry::new(GameId::parse("200").unwrap(), None, added));
        snapshot
    }

    #[test]
    fn json_export_carries_version_and_snapshot_fields() {
        let exported_at = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
        let rendered = render_json_export(&sample(), exported_at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["version"], EXPORT_FORMAT_VERSION);
        assert!(value.get("exportedAt").is_some());
        assert!(value.get("savedAt").is_some());
        assert_eq!(value["entries"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn json_export_parses_back() {
        let rendered = render_json_export(&sample(), Utc::now()).unwrap();
        assert_eq!(parse_snapshot_json(&rendered).unwrap(), sample());
    }

    #[test]
    fn parse_rejects_invalid_game_ids() {
        let input = r#"{"entries": [{"gameId": "", "addedAt": "2024-01-01T00:00:00Z"}],
                        "savedAt": "2024-01-01T00:00:00Z"}"#;
        assert!(parse_snapshot_json(input).is_err());
    }

    #[test]
    fn parse_collapses_duplicates() {
        let input = r#"{"servers": [
                {"gameId": "1", "addedAt": "2024-01-01T00:00:00Z"},
                {"gameId": "1", "addedAt": "2024-02-01T00:00:00Z"}
            ],
            "lastSaved": "2024-03-01T00:00:00Z"}"#;
        let snapshot = parse_snapshot_json(input).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn markdown_export_lists_entries() {
        let rendered = render_markdown_export(&sample());
        assert!(rendered.contains("| 100 | A\\|B | 2023-11-14T22:13:20Z | 2023-11-14T22:13:20Z |"));
        assert!(rendered.contains("| 200 |  | 2023-11-14T22:13:20Z | never |"));
        assert!(rendered.contains("(2 entries)"));
    }

    #[test]
    fn suggested_export_file_name_uses_format_extension() {
        assert_eq!(
            suggested_export_file_name(ExportFormat::Json, 123),
            "warden-export-123.json"
        );
        assert_eq!(
            suggested_export_file_name(ExportFormat::Markdown, 456),
            "warden-export-456.md"
        );
    }
}
