use crate::commands::common::{open_refreshed_registry, RegistrySettings};
use crate::error::CliError;

pub async fn run_stats(as_json: bool, settings: &RegistrySettings) -> Result<(), CliError> {
    let registry = open_refreshed_registry(settings).await?;
    let stats = registry.stats().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Total:            {}", stats.total);
        println!("Checked at least: {}", stats.with_last_check);
        println!("Checked in 24h:   {}", stats.recent_checks);
    }
    Ok(())
}
