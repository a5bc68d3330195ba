//! Ledger client error types.

use std::time::Duration;

use crate::config::ConfigError;
use crate::identity::IdentityError;

/// Errors from ledger calls.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The client is in degraded mode; no network attempt was made.
    #[error("ledger offline: {reason}")]
    Offline { reason: String },

    /// Evaluate found no entry for the key.
    #[error("ledger has no entry for key {key:?}")]
    NotFound { key: String },

    /// Transport failure or a 5xx from the gateway.
    #[error("ledger connectivity failure during {function}: {detail}")]
    Connectivity { function: String, detail: String },

    /// The transaction was rejected by the gateway or its peers.
    #[error("ledger rejected {function} with status {status}: {body}")]
    Endorsement {
        function: String,
        status: u16,
        body: String,
    },

    /// No response within the deadline.
    #[error("ledger call {function} timed out after {after:?}")]
    Timeout { function: String, after: Duration },

    #[error("ledger configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ledger identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl LedgerError {
    /// Whether the caller's remedy is to try again later.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Offline { .. } | Self::Connectivity { .. } | Self::Timeout { .. }
        )
    }
}
