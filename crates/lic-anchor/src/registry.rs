//! # License Registry
//!
//! The record lifecycle around anchoring: create, edit metadata, attach a
//! document, delete, and list what is waiting to be anchored. Every write
//! that changes metadata recomputes h1 with the same canonical field order;
//! only a document upload changes h2.
//!
//! ## Drift
//!
//! Editing an anchored record makes its stored digest differ from the
//! ledger's while the record may still claim `SYNCED`. [`DriftPolicy`]
//! decides what happens to the claim:
//!
//! - [`DriftPolicy::Preserve`] keeps it. The divergence is visible only
//!   through the verifier. This is the default.
//! - [`DriftPolicy::ResetOnChange`] moves the record back to `NOT_SYNCED`
//!   whenever h1 or h2 actually changes, so it shows up in
//!   [`LicenseRegistry::pending_anchors`] again.

use std::io::Read;

use lic_core::{
    file_digest, CaseId, HexDigest, LicenseId, LicenseMetadata, LicenseRecord, SyncStatus,
};
use lic_store::LicenseStore;

use crate::error::AnchorError;

/// What a digest change does to an existing sync claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriftPolicy {
    #[default]
    Preserve,
    ResetOnChange,
}

impl std::str::FromStr for DriftPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(Self::Preserve),
            "reset" => Ok(Self::ResetOnChange),
            other => Err(format!("unknown drift policy {other:?}; expected `preserve` or `reset`")),
        }
    }
}

/// Record-level operations over a [`LicenseStore`].
#[derive(Debug, Clone)]
pub struct LicenseRegistry<S> {
    store: S,
    drift: DriftPolicy,
}

impl<S: LicenseStore> LicenseRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            drift: DriftPolicy::default(),
        }
    }

    pub fn with_drift_policy(mut self, drift: DriftPolicy) -> Self {
        self.drift = drift;
        self
    }

    pub fn drift_policy(&self) -> DriftPolicy {
        self.drift
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a license for `case_id`. h1 is computed, h2 is absent, and
    /// the record starts `NOT_SYNCED`.
    pub async fn create_license(
        &self,
        case_id: CaseId,
        metadata: LicenseMetadata,
    ) -> Result<LicenseRecord, AnchorError> {
        metadata.validate()?;
        let record = LicenseRecord::new(case_id, metadata);
        self.store.insert(&record).await?;
        tracing::info!(license_id = %record.id, case_id = %case_id, "license created");
        Ok(record)
    }

    pub async fn get_license(&self, id: LicenseId) -> Result<LicenseRecord, AnchorError> {
        self.store.get(id).await?.ok_or(AnchorError::NotFound(id))
    }

    /// Replace the metadata and recompute h1. h2 and the file path are
    /// untouched.
    pub async fn update_metadata(
        &self,
        id: LicenseId,
        metadata: LicenseMetadata,
    ) -> Result<LicenseRecord, AnchorError> {
        metadata.validate()?;
        let mut record = self.get_license(id).await?;
        let h1 = metadata.digest(&record.case_id);
        let changed = record.h1.as_ref() != Some(&h1);

        record.metadata = metadata;
        record.h1 = Some(h1);
        self.apply_drift(&mut record, changed, "h1");
        record.touch();

        self.store.update(&record).await?;
        Ok(record)
    }

    /// Fail unless the license exists and may receive a document.
    pub async fn ensure_accepts_document(
        &self,
        id: LicenseId,
    ) -> Result<LicenseRecord, AnchorError> {
        let record = self.get_license(id).await?;
        let status = record.metadata.business_status;
        if status.is_terminal() {
            return Err(AnchorError::LicenseInactive {
                license_id: id,
                status,
            });
        }
        Ok(record)
    }

    /// Hash `reader` to exhaustion and attach the result as h2, with
    /// `stored_path` as the document location.
    ///
    /// The reader is consumed synchronously; callers on an async runtime
    /// with large inputs should hash incrementally with
    /// [`lic_core::FileHasher`] and call [`Self::record_document`].
    pub async fn attach_document<R: Read>(
        &self,
        id: LicenseId,
        reader: R,
        stored_path: impl Into<String>,
    ) -> Result<LicenseRecord, AnchorError> {
        self.ensure_accepts_document(id).await?;
        let h2 = file_digest(reader)?;
        self.record_document(id, h2, stored_path).await
    }

    /// Attach an already computed h2.
    pub async fn record_document(
        &self,
        id: LicenseId,
        h2: HexDigest,
        stored_path: impl Into<String>,
    ) -> Result<LicenseRecord, AnchorError> {
        let mut record = self.ensure_accepts_document(id).await?;
        let changed = record.h2.as_ref() != Some(&h2);

        record.h2 = Some(h2);
        record.file_path = Some(stored_path.into());
        self.apply_drift(&mut record, changed, "h2");
        record.touch();

        self.store.update(&record).await?;
        tracing::info!(license_id = %id, "document attached");
        Ok(record)
    }

    /// Delete a license that is no longer in force. Returns the deleted
    /// record so the caller can clean up its document.
    pub async fn delete_license(&self, id: LicenseId) -> Result<LicenseRecord, AnchorError> {
        let record = self.get_license(id).await?;
        let status = record.metadata.business_status;
        if status.is_in_force() {
            return Err(AnchorError::LicenseActive {
                license_id: id,
                status,
            });
        }
        if record.sync_status == SyncStatus::Synced {
            tracing::warn!(license_id = %id, "deleting an anchored license; its ledger asset remains");
        }
        if !self.store.delete(id).await? {
            return Err(AnchorError::NotFound(id));
        }
        Ok(record)
    }

    /// Records with both digests whose status is `NOT_SYNCED` or
    /// `SYNC_FAILED`, oldest first.
    pub async fn pending_anchors(&self) -> Result<Vec<LicenseRecord>, AnchorError> {
        let records = self
            .store
            .list_by_sync_status(&[SyncStatus::NotSynced, SyncStatus::SyncFailed])
            .await?;
        Ok(records.into_iter().filter(|r| r.is_anchor_pending()).collect())
    }

    /// All records in the given statuses.
    pub async fn list_by_sync_status(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<LicenseRecord>, AnchorError> {
        Ok(self.store.list_by_sync_status(statuses).await?)
    }

    fn apply_drift(&self, record: &mut LicenseRecord, changed: bool, digest: &str) {
        if !changed || record.sync_status == SyncStatus::NotSynced {
            return;
        }
        match self.drift {
            DriftPolicy::ResetOnChange => {
                tracing::info!(
                    license_id = %record.id,
                    digest,
                    previous = %record.sync_status,
                    "digest changed; sync status reset"
                );
                record.sync_status = SyncStatus::NotSynced;
            }
            DriftPolicy::Preserve if record.sync_status == SyncStatus::Synced => {
                tracing::warn!(
                    license_id = %record.id,
                    digest,
                    "digest of an anchored license changed; ledger copy is now stale"
                );
            }
            DriftPolicy::Preserve => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_policy_parses_env_values() {
        assert_eq!("preserve".parse::<DriftPolicy>().unwrap(), DriftPolicy::Preserve);
        assert_eq!("reset".parse::<DriftPolicy>().unwrap(), DriftPolicy::ResetOnChange);
        assert!("sometimes".parse::<DriftPolicy>().is_err());
        assert_eq!(DriftPolicy::default(), DriftPolicy::Preserve);
    }
}
