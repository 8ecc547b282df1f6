use warden_core::RemoveOutcome;

use crate::commands::common::{open_registry, report_applied, RegistrySettings};
use crate::error::CliError;

pub async fn run_remove(game_id: &str, settings: &RegistrySettings) -> Result<(), CliError> {
    let registry = open_registry(settings)?;
    let applied = registry.remove(game_id).await?;
    report_applied(&applied);

    match applied.outcome {
        RemoveOutcome::Removed(entry) => {
            println!("{}", entry.game_id);
            Ok(())
        }
        RemoveOutcome::NotFound => Err(CliError::NotWhitelisted(game_id.trim().to_string())),
    }
}
