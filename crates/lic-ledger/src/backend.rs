//! Runtime selection between ledger implementations.

use crate::config::{LedgerConfig, LedgerMode};
use crate::error::LedgerError;
use crate::gateway::GatewayLedgerClient;
use crate::memory::InMemoryLedger;
use crate::LedgerClient;

#[derive(Debug, Clone)]
pub enum LedgerBackend {
    Gateway(GatewayLedgerClient),
    Memory(InMemoryLedger),
}

impl LedgerBackend {
    /// Build the backend `config.mode` names. Never fails: an unreachable
    /// gateway yields a degraded client.
    pub async fn connect(config: LedgerConfig) -> Self {
        match config.mode {
            LedgerMode::Gateway => Self::Gateway(GatewayLedgerClient::connect(config).await),
            LedgerMode::Memory => {
                tracing::warn!("using the in-memory ledger; anchors are not durable");
                Self::Memory(InMemoryLedger::new())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gateway(_) => "gateway",
            Self::Memory(_) => "memory",
        }
    }

    /// Why the backend is degraded, if it is.
    pub fn degraded_reason(&self) -> Option<String> {
        match self {
            Self::Gateway(c) => c.degraded_reason().map(str::to_string),
            Self::Memory(m) if m.is_degraded() => Some("in-memory ledger switched offline".into()),
            Self::Memory(_) => None,
        }
    }
}

impl LedgerClient for LedgerBackend {
    async fn submit(&self, function: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        match self {
            Self::Gateway(c) => c.submit(function, args).await,
            Self::Memory(m) => m.submit(function, args).await,
        }
    }

    async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        match self {
            Self::Gateway(c) => c.evaluate(function, args).await,
            Self::Memory(m) => m.evaluate(function, args).await,
        }
    }

    fn is_degraded(&self) -> bool {
        match self {
            Self::Gateway(c) => c.is_degraded(),
            Self::Memory(m) => m.is_degraded(),
        }
    }
}
