use warden_core::AddOutcome;

use crate::commands::common::{open_registry, report_applied, RegistrySettings};
use crate::error::CliError;

pub async fn run_add(
    game_id: &str,
    name: Option<String>,
    settings: &RegistrySettings,
) -> Result<(), CliError> {
    let registry = open_registry(settings)?;
    let applied = registry.add(game_id, name).await?;
    report_applied(&applied);

    match applied.outcome {
        AddOutcome::Created(entry) => {
            println!("{}", entry.game_id);
            Ok(())
        }
        AddOutcome::AlreadyExists => Err(CliError::AlreadyWhitelisted(game_id.trim().to_string())),
    }
}
