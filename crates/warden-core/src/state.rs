//! Shared registry state types.

use serde::{Deserialize, Serialize};

/// Which store answered a registry call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    Primary,
    LocalCache,
}

/// Operating mode reported by health introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionMode {
    Primary,
    LocalFallback,
}

impl ConnectionMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::LocalFallback => "local-fallback",
        }
    }
}

impl From<DataSource> for ConnectionMode {
    fn from(source: DataSource) -> Self {
        match source {
            DataSource::Primary => Self::Primary,
            DataSource::LocalCache => Self::LocalFallback,
        }
    }
}
