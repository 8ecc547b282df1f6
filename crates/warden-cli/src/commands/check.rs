use serde::Serialize;
use warden_core::{CheckOutcome, DataSource};

use crate::commands::common::{open_registry, report_applied, RegistrySettings};
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub game_id: String,
    pub whitelisted: bool,
    pub server_name: Option<String>,
    pub source: DataSource,
}

pub fn check_report(game_id: &str, outcome: &CheckOutcome, source: DataSource) -> CheckReport {
    CheckReport {
        game_id: game_id.trim().to_string(),
        whitelisted: outcome.is_whitelisted(),
        server_name: outcome.entry().and_then(|entry| entry.display_name.clone()),
        source,
    }
}

pub async fn run_check(
    game_id: &str,
    as_json: bool,
    settings: &RegistrySettings,
) -> Result<(), CliError> {
    let registry = open_registry(settings)?;
    let applied = registry.check(game_id).await?;
    report_applied(&applied);

    let report = check_report(game_id, &applied.outcome, applied.source);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.whitelisted {
        match &report.server_name {
            Some(name) => println!("{} is whitelisted ({name})", report.game_id),
            None => println!("{} is whitelisted", report.game_id),
        }
    } else {
        println!("{} is not whitelisted", report.game_id);
    }
    Ok(())
}
