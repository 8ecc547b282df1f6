use crate::commands::common::{open_registry, report_applied, RegistrySettings};
use crate::error::CliError;

pub async fn run_clear(confirmed: bool, settings: &RegistrySettings) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ConfirmationRequired);
    }

    let registry = open_registry(settings)?;
    let applied = registry.clear().await;
    report_applied(&applied);

    println!("Removed {} entries", applied.outcome);
    Ok(())
}
