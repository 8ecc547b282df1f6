//! Timeout-bounded access to the primary backend
//!
//! The connector never raises: every transport, auth or timeout problem folds
//! into [`Health::Unhealthy`] and is recorded for introspection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::PrimaryBackend;
use crate::util;

/// Default bound on a single connection attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Accepted range for the connect timeout, in seconds
pub const CONNECT_TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=60;

/// Outcome of a connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
}

impl Health {
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Attempt counters exposed through connection introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorStatus {
    pub healthy: bool,
    pub attempts: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Default)]
struct AttemptLog {
    last_attempt_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Lazily established, health-tracked connection to a [`PrimaryBackend`]
pub struct BackendConnector<B> {
    backend: B,
    timeout: Duration,
    healthy: AtomicBool,
    attempts: AtomicU64,
    failures: AtomicU64,
    log: Mutex<AttemptLog>,
}

impl<B: PrimaryBackend> BackendConnector<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            healthy: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            log: Mutex::new(AttemptLog::default()),
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Establish or verify the connection, giving up after the configured timeout
    pub async fn connect(&self) -> Health {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let failure = match tokio::time::timeout(self.timeout, self.backend.connect()).await {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(util::compact_text(&error.to_string())),
            Err(_) => Some(format!(
                "connection timed out after {}s",
                self.timeout.as_secs()
            )),
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        {
            let mut log = self.log();
            log.last_attempt_at = Some(util::now());
            if let Some(error) = &failure {
                log.last_error = Some(error.clone());
            }
        }

        match failure {
            None => {
                let was_healthy = self.healthy.swap(true, Ordering::AcqRel);
                if !was_healthy {
                    tracing::info!(
                        target_db = %self.backend.describe(),
                        elapsed_ms,
                        "Primary backend connected"
                    );
                }
                Health::Healthy
            }
            Some(error) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let was_healthy = self.healthy.swap(false, Ordering::AcqRel);
                if was_healthy {
                    tracing::warn!(elapsed_ms, %error, "Primary backend became unreachable");
                } else {
                    tracing::debug!(elapsed_ms, %error, "Primary backend still unreachable");
                }
                self.backend.disconnect().await;
                Health::Unhealthy
            }
        }
    }

    /// Health as of the last attempt
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Record a primary operation that failed after a successful connect
    pub async fn mark_unhealthy(&self, reason: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.healthy.store(false, Ordering::Release);
        self.log().last_error = Some(util::compact_text(reason));
        tracing::warn!(error = %reason, "Primary backend operation failed");
        self.backend.disconnect().await;
    }

    pub fn status(&self) -> ConnectorStatus {
        let log = self.log();
        ConnectorStatus {
            healthy: self.is_healthy(),
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_attempt_at: log.last_attempt_at,
            last_error: log.last_error.clone(),
            timeout_secs: self.timeout.as_secs(),
        }
    }

    fn log(&self) -> std::sync::MutexGuard<'_, AttemptLog> {
        self.log.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BackendConfig, LibSqlBackend};
    use crate::error::{Error, Result};
    use crate::models::{Entry, GameId, Snapshot};

    /// Backend whose `connect` never finishes
    struct HangingBackend;

    impl PrimaryBackend for HangingBackend {
        fn describe(&self) -> String {
            "hanging".into()
        }

        async fn connect(&self) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn disconnect(&self) {}

        async fn load_snapshot(&self) -> Result<Snapshot> {
            Err(Error::Database("unreachable".into()))
        }

        async fn insert_entry(&self, _: &Entry, _: DateTime<Utc>) -> Result<bool> {
            Err(Error::Database("unreachable".into()))
        }

        async fn update_entry(&self, _: &Entry, _: DateTime<Utc>) -> Result<bool> {
            Err(Error::Database("unreachable".into()))
        }

        async fn delete_entry(&self, _: &GameId, _: DateTime<Utc>) -> Result<bool> {
            Err(Error::Database("unreachable".into()))
        }

        async fn replace_all(&self, _: &Snapshot) -> Result<()> {
            Err(Error::Database("unreachable".into()))
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connect_to_memory_backend_is_healthy() {
        let connector = BackendConnector::new(
            LibSqlBackend::new(BackendConfig::Memory),
            DEFAULT_CONNECT_TIMEOUT,
        );
        assert!(!connector.is_healthy());
        assert_eq!(connector.connect().await, Health::Healthy);
        assert!(connector.is_healthy());

        let status = connector.status();
        assert_eq!(status.attempts, 1);
        assert_eq!(status.failures, 0);
        assert!(status.last_attempt_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connect_timeout_folds_into_unhealthy() {
        let connector = BackendConnector::new(HangingBackend, Duration::from_millis(50));
        assert_eq!(connector.connect().await, Health::Unhealthy);
        assert!(!connector.is_healthy());

        let status = connector.status();
        assert_eq!(status.failures, 1);
        assert!(status.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connect_error_folds_into_unhealthy() {
        let connector = BackendConnector::new(
            LibSqlBackend::new(BackendConfig::remote("", "")),
            DEFAULT_CONNECT_TIMEOUT,
        );
        assert_eq!(connector.connect().await, Health::Unhealthy);
        assert!(connector.status().last_error.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_unhealthy_clears_health() {
        let connector = BackendConnector::new(
            LibSqlBackend::new(BackendConfig::Memory),
            DEFAULT_CONNECT_TIMEOUT,
        );
        connector.connect().await;
        connector.mark_unhealthy("write failed").await;

        assert!(!connector.is_healthy());
        let status = connector.status();
        assert_eq!(status.failures, 1);
        assert_eq!(status.last_error.as_deref(), Some("write failed"));
    }
}
