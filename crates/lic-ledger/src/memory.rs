//! # In-Process Ledger
//!
//! Implements the license chaincode against a `HashMap`: `AnchorLicense`
//! overwrites the JSON entry for an id, `QueryLicense` returns it or fails
//! with not-found.
//!
//! Used as the `LEDGER_MODE=memory` development backend and as the scripted
//! fake in tests. The fake controls are:
//!
//! - [`InMemoryLedger::set_offline`]: degraded mode.
//! - [`InMemoryLedger::fail_next_submits`]: the next `n` submits fail with
//!   a connectivity error.
//! - [`InMemoryLedger::set_latency`]: every call sleeps first.
//! - [`InMemoryLedger::put_raw`]: store arbitrary bytes under a key.
//! - Call counters for submit and evaluate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::contract::{LedgerAsset, ANCHOR_LICENSE, QUERY_LICENSE};
use crate::error::LedgerError;
use crate::LedgerClient;

#[derive(Debug, Default)]
struct Inner {
    state: RwLock<HashMap<String, Vec<u8>>>,
    offline: AtomicBool,
    failing_submits: AtomicU32,
    latency_ms: AtomicU64,
    submit_calls: AtomicU64,
    evaluate_calls: AtomicU64,
}

/// Shared handle to an in-process ledger. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Inner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger that starts in degraded mode.
    pub fn offline() -> Self {
        let ledger = Self::new();
        ledger.set_offline(true);
        ledger
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `n` submits fail with [`LedgerError::Connectivity`].
    pub fn fail_next_submits(&self, n: u32) {
        self.inner.failing_submits.store(n, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn submit_calls(&self) -> u64 {
        self.inner.submit_calls.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> u64 {
        self.inner.evaluate_calls.load(Ordering::SeqCst)
    }

    /// The decoded asset stored under `id`, if any and if well-formed.
    pub fn asset(&self, id: &str) -> Option<LedgerAsset> {
        self.inner
            .state
            .read()
            .get(id)
            .and_then(|bytes| LedgerAsset::decode(bytes).ok())
    }

    /// Store raw bytes under `id`, bypassing the chaincode.
    pub fn put_raw(&self, id: &str, bytes: impl Into<Vec<u8>>) {
        self.inner.state.write().insert(id.to_string(), bytes.into());
    }

    async fn delay(&self) {
        let ms = self.inner.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(LedgerError::Offline {
                reason: "in-memory ledger switched offline".into(),
            })
        } else {
            Ok(())
        }
    }

    /// Consume one injected failure, if any remain.
    fn take_injected_failure(&self) -> bool {
        self.inner
            .failing_submits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn rejected(function: &str, body: impl Into<String>) -> LedgerError {
    LedgerError::Endorsement {
        function: function.to_string(),
        status: 400,
        body: body.into(),
    }
}

impl LedgerClient for InMemoryLedger {
    async fn submit(&self, function: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        self.inner.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.delay().await;
        if self.take_injected_failure() {
            return Err(LedgerError::Connectivity {
                function: function.to_string(),
                detail: "injected transport failure".into(),
            });
        }
        tracing::info!(function, ?args, "ledger submit (in-memory)");

        match (function, args) {
            (ANCHOR_LICENSE, [id, h1, h2]) => {
                let asset = LedgerAsset {
                    id: id.clone(),
                    h1_hash: h1.clone(),
                    h2_hash: h2.clone(),
                };
                let bytes = asset
                    .encode()
                    .map_err(|e| rejected(function, e.to_string()))?;
                self.inner.state.write().insert(id.clone(), bytes);
                Ok(Vec::new())
            }
            (ANCHOR_LICENSE, _) => Err(rejected(
                function,
                format!("expected 3 arguments, got {}", args.len()),
            )),
            _ => Err(rejected(function, "unknown function")),
        }
    }

    async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        self.inner.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.delay().await;
        tracing::info!(function, ?args, "ledger evaluate (in-memory)");

        match (function, args) {
            (QUERY_LICENSE, [id]) => self
                .inner
                .state
                .read()
                .get(id)
                .cloned()
                .ok_or_else(|| LedgerError::NotFound { key: id.clone() }),
            (QUERY_LICENSE, _) => Err(rejected(
                function,
                format!("expected 1 argument, got {}", args.len()),
            )),
            _ => Err(rejected(function, "unknown function")),
        }
    }

    fn is_degraded(&self) -> bool {
        self.inner.offline.load(Ordering::SeqCst)
    }
}
