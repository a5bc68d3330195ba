//! # Verifier
//!
//! Read-only comparison of a record's stored digests against the ledger's
//! copy. `SYNCED` is only a local claim; this is the check that the ledger
//! actually agrees.
//!
//! A missing digest on either side makes the corresponding match `false`
//! and the report says which side lacks it. "Both absent" is never a match.

use std::time::Duration;

use lic_core::{HexDigest, LicenseId, SyncStatus};
use lic_ledger::{LedgerAsset, LedgerClient, LedgerError, QUERY_LICENSE};
use lic_store::LicenseStore;
use serde::Serialize;

use crate::error::AnchorError;
use crate::DEFAULT_LEDGER_DEADLINE;

/// Outcome of comparing one license across both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub license_id: LicenseId,
    /// The store's claim at the time of the check.
    pub sync_status: SyncStatus,
    pub h1_local: Option<String>,
    pub h2_local: Option<String>,
    pub h1_ledger: Option<String>,
    pub h2_ledger: Option<String>,
    pub h1_matches: bool,
    pub h2_matches: bool,
    pub message: String,
}

impl VerificationReport {
    /// Both digests present on both sides and equal.
    pub fn is_consistent(&self) -> bool {
        self.h1_matches && self.h2_matches
    }
}

/// Compare one digest. Returns whether it matches and, if not, why.
fn compare(name: &str, local: Option<&str>, ledger: Option<&str>) -> (bool, Option<String>) {
    match (local, ledger) {
        (Some(l), Some(r)) if l == r => (true, None),
        (Some(_), Some(_)) => (false, Some(format!("{name} differs from the ledger"))),
        (None, Some(_)) => (false, Some(format!("{name} is not computed locally"))),
        (Some(_), None) => (false, Some(format!("{name} is absent on the ledger"))),
        (None, None) => (false, Some(format!("{name} is absent on both sides"))),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Checks stored digests against the ledger.
#[derive(Debug, Clone)]
pub struct Verifier<S, L> {
    store: S,
    ledger: L,
    deadline: Duration,
}

impl<S: LicenseStore, L: LedgerClient> Verifier<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self {
            store,
            ledger,
            deadline: DEFAULT_LEDGER_DEADLINE,
        }
    }

    /// Bound each ledger evaluate by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Compare the license's stored digests with the ledger's. Never mutates
    /// either store.
    #[tracing::instrument(skip(self), fields(license_id = %id))]
    pub async fn verify_license(&self, id: LicenseId) -> Result<VerificationReport, AnchorError> {
        let result = self.verify(id).await;
        let outcome = match &result {
            Ok(report) if report.is_consistent() => "consistent",
            Ok(_) => "drift",
            Err(e) => e.kind(),
        };
        metrics::counter!("lic_anchor_verify_total", "outcome" => outcome).increment(1);
        result
    }

    async fn verify(&self, id: LicenseId) -> Result<VerificationReport, AnchorError> {
        let record = self.store.get(id).await?.ok_or(AnchorError::NotFound(id))?;

        let asset = self.query(id).await?;
        if asset.id != id.to_string() {
            return Err(AnchorError::DecodeFailure {
                license_id: id,
                reason: format!("ledger returned asset for {:?}", asset.id),
            });
        }

        let h1_local = record.h1.as_ref().map(HexDigest::to_string);
        let h2_local = record.h2.as_ref().map(HexDigest::to_string);
        let h1_ledger = non_empty(&asset.h1_hash);
        let h2_ledger = non_empty(&asset.h2_hash);

        let (h1_matches, h1_reason) = compare("h1", h1_local.as_deref(), h1_ledger.as_deref());
        let (h2_matches, h2_reason) = compare("h2", h2_local.as_deref(), h2_ledger.as_deref());

        let reasons: Vec<String> = h1_reason.into_iter().chain(h2_reason).collect();
        let message = if reasons.is_empty() {
            "stored digests match the ledger".to_string()
        } else {
            reasons.join("; ")
        };
        if !reasons.is_empty() {
            tracing::warn!(license_id = %id, %message, "ledger disagrees with stored digests");
        }

        Ok(VerificationReport {
            license_id: id,
            sync_status: record.sync_status,
            h1_local,
            h2_local,
            h1_ledger,
            h2_ledger,
            h1_matches,
            h2_matches,
            message,
        })
    }

    async fn query(&self, id: LicenseId) -> Result<LedgerAsset, AnchorError> {
        if self.ledger.is_degraded() {
            return Err(AnchorError::LedgerOffline {
                reason: "ledger client is in degraded mode".into(),
            });
        }

        let args = [id.to_string()];
        let evaluated =
            tokio::time::timeout(self.deadline, self.ledger.evaluate(QUERY_LICENSE, &args)).await;
        let bytes = match evaluated {
            Err(_) => {
                return Err(AnchorError::LedgerOffline {
                    reason: format!("ledger query timed out after {:?}", self.deadline),
                })
            }
            Ok(Ok(bytes)) => bytes,
            Ok(Err(LedgerError::NotFound { .. })) => return Err(AnchorError::AssetNotFound(id)),
            Ok(Err(e)) if e.is_unavailable() => {
                return Err(AnchorError::LedgerOffline {
                    reason: e.to_string(),
                })
            }
            Ok(Err(cause)) => {
                return Err(AnchorError::QueryFailure {
                    license_id: id,
                    cause,
                })
            }
        };

        LedgerAsset::decode(&bytes).map_err(|e| AnchorError::DecodeFailure {
            license_id: id,
            reason: e.to_string(),
        })
    }
}
