use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Manage the game server whitelist from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Where the registry lives; each flag falls back to an environment variable
#[derive(Args, Debug, Default, Clone)]
pub struct RegistryArgs {
    /// Local cache file [env: WARDEN_CACHE_PATH]
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,

    /// Remote libSQL URL [env: WARDEN_DATABASE_URL]
    #[arg(long, global = true, value_name = "URL", conflicts_with = "database_path")]
    pub database_url: Option<String>,

    /// Local primary database file [env: WARDEN_DATABASE_PATH]
    #[arg(long, global = true, value_name = "PATH")]
    pub database_path: Option<PathBuf>,

    /// Seconds to wait for the primary before falling back [env: WARDEN_CONNECT_TIMEOUT_SECS]
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=60)
    )]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Whitelist a game
    Add {
        /// Game identifier
        game_id: String,
        /// Optional display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Remove a game from the whitelist
    #[command(alias = "rm")]
    Remove {
        /// Game identifier
        game_id: String,
    },
    /// Check whether a game is whitelisted
    Check {
        /// Game identifier
        game_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change or clear a game's display name
    Rename {
        /// Game identifier
        game_id: String,
        /// New display name (cleared when omitted)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List whitelisted games, newest first
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whitelist counters
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show primary backend connection details
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the whitelist
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Replace the whitelist with an exported snapshot
    Import {
        /// Snapshot JSON file
        file: PathBuf,
    },
    /// Adopt a snapshot only if it is newer than the current whitelist
    Sync {
        /// Snapshot JSON file
        file: PathBuf,
    },
    /// Remove every whitelisted game
    Clear {
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for warden_core::export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
