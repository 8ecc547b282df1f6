use std::path::Path;

use crate::commands::common::{open_registry, read_snapshot_file, report_applied, RegistrySettings};
use crate::error::CliError;

pub async fn run_sync(file: &Path, settings: &RegistrySettings) -> Result<(), CliError> {
    let incoming = read_snapshot_file(file)?;
    let registry = open_registry(settings)?;
    let applied = registry.sync(incoming).await;
    report_applied(&applied);

    if applied.outcome.changed {
        println!(
            "Sync completed: adopted {} entries",
            applied.outcome.snapshot.len()
        );
    } else {
        println!("Sync skipped: current whitelist is newer");
    }
    Ok(())
}
