use warden_core::RenameOutcome;

use crate::commands::common::{open_registry, report_applied, RegistrySettings};
use crate::error::CliError;

pub async fn run_rename(
    game_id: &str,
    name: Option<String>,
    settings: &RegistrySettings,
) -> Result<(), CliError> {
    let registry = open_registry(settings)?;
    let applied = registry.rename(game_id, name).await?;
    report_applied(&applied);

    match applied.outcome {
        RenameOutcome::Renamed(entry) => {
            println!(
                "{}  {}",
                entry.game_id,
                entry.display_name.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        RenameOutcome::NotFound => Err(CliError::NotWhitelisted(game_id.trim().to_string())),
    }
}
