//! # lic-ledger: Ledger Client
//!
//! A thin capability over the distributed ledger that anchors license
//! digests. Two operations:
//!
//! - [`LedgerClient::submit`]: consensus-backed write. Slow (multi-second),
//!   fails on connectivity, endorsement rejection, or timeout.
//! - [`LedgerClient::evaluate`]: single-node read. A missing key is
//!   reported as [`LedgerError::NotFound`], never as a generic failure.
//!
//! ## Degraded Mode
//!
//! A client that could not reach the ledger at startup still constructs.
//! It reports [`LedgerClient::is_degraded`] and every call returns
//! [`LedgerError::Offline`] without touching the network. The rest of the
//! system relies on this to keep serving without the ledger.
//!
//! ## Implementations
//!
//! | Type | Use |
//! |------|-----|
//! | [`GatewayLedgerClient`] | HTTP gateway with mTLS identity from a file-system wallet |
//! | [`InMemoryLedger`] | In-process ledger for development; scripted fake in tests |
//! | [`LedgerBackend`] | Runtime selection between the two |

pub mod backend;
pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod memory;
pub(crate) mod retry;

use std::future::Future;

pub use backend::LedgerBackend;
pub use config::{ConfigError, LedgerConfig, LedgerMode};
pub use contract::{LedgerAsset, ANCHOR_LICENSE, QUERY_LICENSE};
pub use error::LedgerError;
pub use gateway::GatewayLedgerClient;
pub use identity::{IdentityError, Wallet, X509Identity};
pub use memory::InMemoryLedger;

/// Capability over the ledger network.
///
/// Implementations must be safe for concurrent in-flight calls.
pub trait LedgerClient: Send + Sync {
    /// Submit a transaction for endorsement and commit. Returns the raw
    /// transaction result.
    fn submit(
        &self,
        function: &str,
        args: &[String],
    ) -> impl Future<Output = Result<Vec<u8>, LedgerError>> + Send;

    /// Evaluate a read-only transaction on a single peer.
    fn evaluate(
        &self,
        function: &str,
        args: &[String],
    ) -> impl Future<Output = Result<Vec<u8>, LedgerError>> + Send;

    /// Whether the client is running without a ledger connection.
    fn is_degraded(&self) -> bool;
}

impl<L: LedgerClient> LedgerClient for std::sync::Arc<L> {
    fn submit(
        &self,
        function: &str,
        args: &[String],
    ) -> impl Future<Output = Result<Vec<u8>, LedgerError>> + Send {
        (**self).submit(function, args)
    }

    fn evaluate(
        &self,
        function: &str,
        args: &[String],
    ) -> impl Future<Output = Result<Vec<u8>, LedgerError>> + Send {
        (**self).evaluate(function, args)
    }

    fn is_degraded(&self) -> bool {
        (**self).is_degraded()
    }
}
