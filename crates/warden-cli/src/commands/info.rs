use warden_core::ConnectionInfo;

use crate::commands::common::{open_refreshed_registry, RegistrySettings};
use crate::error::CliError;

pub fn format_info_lines(info: &ConnectionInfo) -> Vec<String> {
    let mut lines = vec![
        format!("Mode:      {}", info.mode.label()),
        format!("Primary:   {}", info.primary_target),
        format!("Cache:     {}", info.cache_location),
        format!(
            "Pending:   {}",
            if info.pending_reconciliation { "yes" } else { "no" }
        ),
        format!(
            "Attempts:  {} ({} failed, timeout {}s)",
            info.connector.attempts, info.connector.failures, info.connector.timeout_secs
        ),
    ];
    if let Some(error) = &info.connector.last_error {
        lines.push(format!("Last error: {error}"));
    }
    lines
}

pub async fn run_info(as_json: bool, settings: &RegistrySettings) -> Result<(), CliError> {
    let registry = open_refreshed_registry(settings).await?;
    let info = registry.connection_info();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        for line in format_info_lines(&info) {
            println!("{line}");
        }
    }
    Ok(())
}
