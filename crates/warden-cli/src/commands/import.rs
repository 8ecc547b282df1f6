use std::path::Path;

use crate::commands::common::{open_registry, read_snapshot_file, report_applied, RegistrySettings};
use crate::error::CliError;

pub async fn run_import(file: &Path, settings: &RegistrySettings) -> Result<(), CliError> {
    let incoming = read_snapshot_file(file)?;
    let registry = open_registry(settings)?;
    let applied = registry.import(incoming).await;
    report_applied(&applied);

    println!("Imported {} entries", applied.outcome.snapshot.len());
    Ok(())
}
