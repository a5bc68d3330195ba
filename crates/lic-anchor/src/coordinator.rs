//! # Anchoring Coordinator
//!
//! Drives a license record from `NOT_SYNCED` / `SYNC_FAILED` to `SYNCED` by
//! writing its digests to the ledger.
//!
//! ## Push Protocol
//!
//! 1. Load the record. Absent ⇒ [`AnchorError::NotFound`].
//! 2. Degraded ledger ⇒ [`AnchorError::LedgerOffline`]. Nothing changes.
//! 3. Missing h1 or h2 ⇒ [`AnchorError::MissingHashes`]. Nothing changes.
//! 4. Already `SYNCED` ⇒ [`AnchorError::AlreadySynced`]. No ledger call.
//! 5. `submit("AnchorLicense", id, h1, h2)` under a deadline.
//!    - Failure: record `SYNC_FAILED` (unless a racing push already made it
//!      `SYNCED`), return [`AnchorError::SubmitFailure`]. If recording fails
//!      too, [`AnchorError::SubmitAndPersistFailure`].
//!    - Success: record `SYNCED`, but only if the stored digests are still
//!      the ones submitted. An edit that landed during the submit yields
//!      [`AnchorError::StaleAnchor`] and the status is left alone. If the
//!      write fails the ledger is ahead: [`AnchorError::PersistFailure`].
//!
//! There is no lock between steps 1 and 5. Two concurrent pushes of the
//! same record may both submit; the ledger is last-write-wins on the same
//! key, so the duplicate costs a round-trip and nothing else.
//!
//! Retries are the caller's: pushing a `SYNC_FAILED` record again repeats
//! the protocol.

use std::time::Duration;

use chrono::{DateTime, Utc};
use lic_core::{HexDigest, LicenseId, SyncStatus};
use lic_ledger::{LedgerAsset, LedgerClient, LedgerError, ANCHOR_LICENSE};
use lic_store::{LicenseStore, SyncGuard};
use serde::Serialize;

use crate::error::AnchorError;
use crate::DEFAULT_LEDGER_DEADLINE;

/// Proof that a push completed on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorReceipt {
    pub license_id: LicenseId,
    pub h1: HexDigest,
    pub h2: HexDigest,
    /// Raw transaction result returned by the ledger.
    #[serde(skip)]
    pub ledger_result: Vec<u8>,
    pub anchored_at: DateTime<Utc>,
}

/// Orchestrates store reads, ledger submits, and status writes.
#[derive(Debug, Clone)]
pub struct AnchorCoordinator<S, L> {
    store: S,
    ledger: L,
    deadline: Duration,
}

impl<S: LicenseStore, L: LedgerClient> AnchorCoordinator<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self {
            store,
            ledger,
            deadline: DEFAULT_LEDGER_DEADLINE,
        }
    }

    /// Bound each ledger submit by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Anchor the license's current digests on the ledger.
    #[tracing::instrument(skip(self), fields(license_id = %id))]
    pub async fn push_to_ledger(&self, id: LicenseId) -> Result<AnchorReceipt, AnchorError> {
        let result = self.push(id).await;
        let outcome = match &result {
            Ok(_) => "synced",
            Err(e) => e.kind(),
        };
        metrics::counter!("lic_anchor_push_total", "outcome" => outcome).increment(1);
        result
    }

    async fn push(&self, id: LicenseId) -> Result<AnchorReceipt, AnchorError> {
        let record = self.store.get(id).await?.ok_or(AnchorError::NotFound(id))?;

        if self.ledger.is_degraded() {
            return Err(AnchorError::LedgerOffline {
                reason: "ledger client is in degraded mode".into(),
            });
        }

        let (h1, h2) = match (&record.h1, &record.h2) {
            (Some(h1), Some(h2)) => (h1.clone(), h2.clone()),
            (None, None) => return Err(missing(id, "h1 and h2")),
            (None, Some(_)) => return Err(missing(id, "h1")),
            (Some(_), None) => return Err(missing(id, "h2")),
        };

        if record.sync_status == SyncStatus::Synced {
            return Err(AnchorError::AlreadySynced(id));
        }

        let asset = LedgerAsset {
            id: id.to_string(),
            h1_hash: h1.to_string(),
            h2_hash: h2.to_string(),
        };
        match self.submit_with_deadline(&asset.anchor_args()).await {
            Ok(ledger_result) => self.record_success(id, h1, h2, ledger_result).await,
            Err(LedgerError::Offline { reason }) => Err(AnchorError::LedgerOffline { reason }),
            Err(cause) => self.record_failure(id, cause).await,
        }
    }

    async fn submit_with_deadline(&self, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        match tokio::time::timeout(self.deadline, self.ledger.submit(ANCHOR_LICENSE, args)).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout {
                function: ANCHOR_LICENSE.to_string(),
                after: self.deadline,
            }),
        }
    }

    async fn record_success(
        &self,
        id: LicenseId,
        h1: HexDigest,
        h2: HexDigest,
        ledger_result: Vec<u8>,
    ) -> Result<AnchorReceipt, AnchorError> {
        let guard = SyncGuard::DigestsAre {
            h1: h1.clone(),
            h2: h2.clone(),
        };
        match self.store.set_sync_status(id, SyncStatus::Synced, guard).await {
            Ok(true) => {
                tracing::info!(license_id = %id, "license anchored");
                Ok(AnchorReceipt {
                    license_id: id,
                    h1,
                    h2,
                    ledger_result,
                    anchored_at: Utc::now(),
                })
            }
            Ok(false) => {
                tracing::warn!(
                    license_id = %id,
                    anchored_h1 = %h1,
                    anchored_h2 = %h2,
                    "digests changed while the anchor was in flight; record left unsynced"
                );
                Err(AnchorError::StaleAnchor { license_id: id })
            }
            Err(cause) => {
                tracing::error!(
                    license_id = %id,
                    error = %cause,
                    "ledger anchor committed but SYNCED status not persisted; ledger is ahead of the store"
                );
                Err(AnchorError::PersistFailure {
                    license_id: id,
                    intended: SyncStatus::Synced,
                    cause,
                })
            }
        }
    }

    async fn record_failure(
        &self,
        id: LicenseId,
        cause: LedgerError,
    ) -> Result<AnchorReceipt, AnchorError> {
        match self
            .store
            .set_sync_status(id, SyncStatus::SyncFailed, SyncGuard::UnlessSynced)
            .await
        {
            Ok(written) => {
                tracing::error!(
                    license_id = %id,
                    error = %cause,
                    status_written = written,
                    "ledger submit failed"
                );
                Err(AnchorError::SubmitFailure {
                    license_id: id,
                    cause,
                })
            }
            Err(persist) => {
                tracing::error!(
                    license_id = %id,
                    submit_error = %cause,
                    persist_error = %persist,
                    "ledger submit failed and SYNC_FAILED status not persisted"
                );
                Err(AnchorError::SubmitAndPersistFailure {
                    license_id: id,
                    submit: cause,
                    persist,
                })
            }
        }
    }
}

fn missing(license_id: LicenseId, missing: &'static str) -> AnchorError {
    AnchorError::MissingHashes {
        license_id,
        missing,
    }
}
