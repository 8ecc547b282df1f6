use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::connector::CONNECT_TIMEOUT_RANGE_SECS;
use warden_core::{
    Applied, BackendConfig, DataSource, Entry, FileCache, LibSqlBackend, RegistryOptions,
    RegistryStore, Snapshot,
};

use crate::cli::RegistryArgs;
use crate::error::CliError;

pub type Registry = RegistryStore<LibSqlBackend>;

/// Fully resolved registry location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub cache_path: PathBuf,
    pub backend: BackendConfig,
    pub connect_timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryListItem {
    pub game_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    pub relative_time: String,
}

pub fn resolve_settings(args: &RegistryArgs) -> Result<RegistrySettings, CliError> {
    resolve_settings_with(args, |name| env::var(name).ok())
}

/// Merge flags with environment fallbacks read through `lookup`
pub fn resolve_settings_with(
    args: &RegistryArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RegistrySettings, CliError> {
    let env_value = |name: &str| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let cache_path = args
        .cache_path
        .clone()
        .or_else(|| env_value("WARDEN_CACHE_PATH").map(PathBuf::from))
        .unwrap_or_else(|| data_dir().join("whitelist.json"));

    let backend = if let Some(url) = args
        .database_url
        .clone()
        .or_else(|| env_value("WARDEN_DATABASE_URL"))
    {
        let auth_token = env_value("WARDEN_DATABASE_AUTH_TOKEN").unwrap_or_default();
        BackendConfig::remote(url, auth_token)
    } else {
        let path = args
            .database_path
            .clone()
            .or_else(|| env_value("WARDEN_DATABASE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| data_dir().join("warden.db"));
        BackendConfig::local(path)
    };

    let connect_timeout_secs = match args.timeout {
        Some(secs) => secs,
        None => match env_value("WARDEN_CONNECT_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| CONNECT_TIMEOUT_RANGE_SECS.contains(secs))
                .ok_or_else(|| {
                    CliError::Config(
                        "WARDEN_CONNECT_TIMEOUT_SECS must be an integer in [1, 60]".to_string(),
                    )
                })?,
            None => 5,
        },
    };

    Ok(RegistrySettings {
        cache_path,
        backend,
        connect_timeout: Duration::from_secs(connect_timeout_secs),
    })
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warden")
}

pub fn open_registry(settings: &RegistrySettings) -> Result<Registry, CliError> {
    Ok(RegistryStore::new(
        LibSqlBackend::new(settings.backend.clone()),
        Box::new(FileCache::new(&settings.cache_path)),
        RegistryOptions::default().with_connect_timeout(settings.connect_timeout),
    )?)
}

/// Open the registry and pull the primary's view into it
pub async fn open_refreshed_registry(settings: &RegistrySettings) -> Result<Registry, CliError> {
    let registry = open_registry(settings)?;
    let source = registry.refresh().await;
    if source == DataSource::LocalCache {
        eprintln!("warning: primary backend unreachable; showing local cache");
    }
    Ok(registry)
}

/// Print fallback and persistence warnings for a mutating call
pub fn report_applied<T>(applied: &Applied<T>) {
    if applied.source == DataSource::LocalCache {
        eprintln!("warning: primary backend unreachable; change kept in local cache until next sync");
    }
    if let Some(warning) = &applied.warning {
        eprintln!("warning: {warning}");
    }
}

pub fn format_entry_lines(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<String> {
    snapshot
        .entries
        .iter()
        .map(|entry| {
            let name = entry.display_name.as_deref().unwrap_or("-");
            let checked = entry.last_checked_at.map_or_else(
                || "never checked".to_string(),
                |checked| format!("checked {}", format_relative_time(checked, now)),
            );
            format!(
                "{}  {}  added {}  {}",
                entry.game_id,
                name,
                format_relative_time(entry.added_at, now),
                checked
            )
        })
        .collect()
}

pub fn entry_to_list_item(entry: &Entry, now: DateTime<Utc>) -> EntryListItem {
    EntryListItem {
        game_id: entry.game_id.to_string(),
        display_name: entry.display_name.clone(),
        added_at: entry.added_at,
        last_checked_at: entry.last_checked_at,
        relative_time: format_relative_time(entry.added_at, now),
    }
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now
        .timestamp_millis()
        .saturating_sub(timestamp.timestamp_millis());
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn read_snapshot_file(path: &std::path::Path) -> Result<Snapshot, CliError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(warden_core::export::parse_snapshot_json(&contents)?)
}
