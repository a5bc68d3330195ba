//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Holds the registry, coordinator, and verifier over
//! the runtime-selected store and ledger backends.

use std::path::PathBuf;
use std::time::Duration;

use lic_anchor::{AnchorCoordinator, DriftPolicy, LicenseRegistry, Verifier, DEFAULT_LEDGER_DEADLINE};
use lic_ledger::LedgerBackend;
use lic_store::StoreBackend;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::middleware::metrics::ApiMetrics;

/// Upper bound for an uploaded license document.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// API configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Root directory for uploaded documents.
    pub upload_dir: PathBuf,
    pub drift_policy: DriftPolicy,
    /// Deadline for each ledger submit or evaluate.
    pub ledger_deadline: Duration,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            upload_dir: PathBuf::from("./uploads"),
            drift_policy: DriftPolicy::default(),
            ledger_deadline: DEFAULT_LEDGER_DEADLINE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Read `PORT`, `UPLOAD_DIR`, `LICENSE_DRIFT_POLICY`, and
    /// `LEDGER_TIMEOUT_SECS`. Unset or empty variables take their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = env_var("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                var: "PORT",
                value: port,
            })?;
        }
        if let Some(dir) = env_var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(policy) = env_var("LICENSE_DRIFT_POLICY") {
            config.drift_policy = policy.parse().map_err(|_| ConfigError::InvalidValue {
                var: "LICENSE_DRIFT_POLICY",
                value: policy,
            })?;
        }
        if let Some(secs) = env_var("LEDGER_TIMEOUT_SECS") {
            let parsed: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
                var: "LEDGER_TIMEOUT_SECS",
                value: secs,
            })?;
            config.ledger_deadline = Duration::from_secs(parsed);
        }
        Ok(config)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: LicenseRegistry<StoreBackend>,
    pub coordinator: AnchorCoordinator<StoreBackend, LedgerBackend>,
    pub verifier: Verifier<StoreBackend, LedgerBackend>,
    /// Request totals since startup, reported by readiness.
    pub metrics: ApiMetrics,
    /// Renders `/metrics`. Absent when no recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store().name())
            .field("ledger", &self.ledger().name())
            .field("prometheus", &self.prometheus.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(config: AppConfig, store: StoreBackend, ledger: LedgerBackend) -> Self {
        let registry = LicenseRegistry::new(store.clone()).with_drift_policy(config.drift_policy);
        let coordinator = AnchorCoordinator::new(store.clone(), ledger.clone())
            .with_deadline(config.ledger_deadline);
        let verifier = Verifier::new(store, ledger).with_deadline(config.ledger_deadline);
        Self {
            config,
            registry,
            coordinator,
            verifier,
            metrics: ApiMetrics::new(),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn store(&self) -> &StoreBackend {
        self.registry.store()
    }

    pub fn ledger(&self) -> &LedgerBackend {
        self.coordinator.ledger()
    }

    /// Directory holding one license's uploaded documents.
    pub fn license_dir(&self, id: lic_core::LicenseId) -> PathBuf {
        self.config.upload_dir.join("licenses").join(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.drift_policy, DriftPolicy::Preserve);
        assert_eq!(config.ledger_deadline, Duration::from_secs(30));
    }

    #[test]
    fn license_dir_is_scoped_by_id() {
        let config = AppConfig {
            upload_dir: PathBuf::from("/srv/uploads"),
            ..AppConfig::default()
        };
        let state = AppState::new(config, StoreBackend::memory(), LedgerBackend::Memory(Default::default()));
        let id = lic_core::LicenseId::new();
        assert_eq!(
            state.license_dir(id),
            PathBuf::from(format!("/srv/uploads/licenses/{id}"))
        );
    }
}
