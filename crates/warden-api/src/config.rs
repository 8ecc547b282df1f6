use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use warden_core::connector::CONNECT_TIMEOUT_RANGE_SECS;
use warden_core::BackendConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Local cache file; an in-process cache is used when unset
    pub cache_path: Option<PathBuf>,
    pub backend: BackendConfig,
    pub connect_timeout: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        // BackendConfig redacts its own auth token.
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("cache_path", &self.cache_path)
            .field("backend", &self.backend)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "WARDEN_API_BIND_ADDR", "127.0.0.1:8080");
        let cache_path = optional_trimmed(&lookup, "WARDEN_CACHE_PATH").map(PathBuf::from);

        let database_url = optional_trimmed(&lookup, "WARDEN_DATABASE_URL");
        let database_path = optional_trimmed(&lookup, "WARDEN_DATABASE_PATH");
        let backend = match (database_url, database_path) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "Set only one of WARDEN_DATABASE_URL and WARDEN_DATABASE_PATH".to_string(),
                ));
            }
            (Some(url), None) => {
                if !is_database_url(&url) {
                    return Err(ConfigError::Invalid(
                        "WARDEN_DATABASE_URL must start with libsql://, https:// or http://"
                            .to_string(),
                    ));
                }
                let auth_token =
                    optional_trimmed(&lookup, "WARDEN_DATABASE_AUTH_TOKEN").unwrap_or_default();
                BackendConfig::remote(url, auth_token)
            }
            (None, Some(path)) => BackendConfig::local(path),
            (None, None) => return Err(ConfigError::MissingVar("WARDEN_DATABASE_URL")),
        };

        let connect_timeout_secs = value_or_default(&lookup, "WARDEN_CONNECT_TIMEOUT_SECS", "5")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "WARDEN_CONNECT_TIMEOUT_SECS must be an integer in [1, 60]".to_string(),
                )
            })?;
        if !CONNECT_TIMEOUT_RANGE_SECS.contains(&connect_timeout_secs) {
            return Err(ConfigError::Invalid(
                "WARDEN_CONNECT_TIMEOUT_SECS must be in [1, 60]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            cache_path,
            backend,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_database_url(value: &str) -> bool {
    ["libsql://", "https://", "http://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}
