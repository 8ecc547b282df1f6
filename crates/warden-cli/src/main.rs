//! Warden CLI - manage the game server whitelist from a terminal
//!
//! Every command opens the registry, talks to the primary backend when it
//! answers within the timeout, and falls back to the local cache otherwise.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::check::run_check;
use crate::commands::clear::run_clear;
use crate::commands::common::resolve_settings;
use crate::commands::completions::run_completions;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::info::run_info;
use crate::commands::list::run_list;
use crate::commands::remove::run_remove;
use crate::commands::rename::run_rename;
use crate::commands::stats::run_stats;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "warden=warn"
        .parse::<tracing_subscriber::filter::Directive>()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let settings = resolve_settings(&cli.registry)?;
    tracing::debug!(?settings, "Resolved registry settings");

    match cli.command {
        Commands::Add { game_id, name } => run_add(&game_id, name, &settings).await?,
        Commands::Remove { game_id } => run_remove(&game_id, &settings).await?,
        Commands::Check { game_id, json } => run_check(&game_id, json, &settings).await?,
        Commands::Rename { game_id, name } => run_rename(&game_id, name, &settings).await?,
        Commands::List { json } => run_list(json, &settings).await?,
        Commands::Stats { json } => run_stats(json, &settings).await?,
        Commands::Info { json } => run_info(json, &settings).await?,
        Commands::Export { format, output } => {
            run_export(format, output.as_deref(), &settings).await?;
        }
        Commands::Import { file } => run_import(&file, &settings).await?,
        Commands::Sync { file } => run_sync(&file, &settings).await?,
        Commands::Clear { yes } => run_clear(yes, &settings).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
