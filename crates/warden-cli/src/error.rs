use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] warden_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Game {0} is already whitelisted")]
    AlreadyWhitelisted(String),
    #[error("Game {0} is not whitelisted")]
    NotWhitelisted(String),
    #[error("Refusing to clear the whitelist without --yes")]
    ConfirmationRequired,
}
