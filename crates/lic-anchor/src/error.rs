//! # Anchoring Errors
//!
//! One variant per failure kind. Callers switch on the variant, never on
//! the message.
//!
//! `SubmitFailure`, `SubmitAndPersistFailure`, and `PersistFailure` mark a
//! real or possible inconsistency between the relational store and the
//! ledger. They are logged at `error` level where they arise, before being
//! returned.

use lic_core::{BusinessStatus, LicenseId, SyncStatus, ValidationError};
use lic_ledger::LedgerError;
use lic_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnchorError {
    /// License id unknown to the relational store.
    #[error("license {0} not found")]
    NotFound(LicenseId),

    /// The ledger has no entry for the license.
    #[error("ledger has no asset for license {0}")]
    AssetNotFound(LicenseId),

    /// Anchoring needs both digests.
    #[error("license {license_id} cannot be anchored: {missing} not computed")]
    MissingHashes {
        license_id: LicenseId,
        /// `"h1"`, `"h2"`, or `"h1 and h2"`.
        missing: &'static str,
    },

    /// The record already claims a confirmed anchor.
    #[error("license {0} is already synced")]
    AlreadySynced(LicenseId),

    /// The ledger client is degraded or unreachable. No state was changed.
    #[error("ledger offline: {reason}")]
    LedgerOffline { reason: String },

    /// The ledger write failed. The record was marked `SYNC_FAILED`.
    #[error("anchoring license {license_id} failed: {cause}")]
    SubmitFailure {
        license_id: LicenseId,
        #[source]
        cause: LedgerError,
    },

    /// The ledger write failed, and so did recording the failure.
    #[error(
        "anchoring license {license_id} failed ({submit}) and the failure could not be recorded ({persist})"
    )]
    SubmitAndPersistFailure {
        license_id: LicenseId,
        submit: LedgerError,
        persist: StoreError,
    },

    /// The ledger committed the anchor but the store did not record it.
    /// The ledger is ahead of the store until a later push or manual repair.
    #[error(
        "license {license_id} is anchored on the ledger but status {intended} was not persisted; ledger is ahead of the store: {cause}"
    )]
    PersistFailure {
        license_id: LicenseId,
        intended: SyncStatus,
        #[source]
        cause: StoreError,
    },

    /// The ledger committed the anchor, but the record's digests changed
    /// while the submit was in flight. The ledger holds superseded digests,
    /// so the record was not marked `SYNCED`; push again.
    #[error(
        "license {license_id} changed while its anchor was in flight; the ledger holds superseded digests"
    )]
    StaleAnchor { license_id: LicenseId },

    /// The ledger's answer could not be parsed.
    #[error("could not decode ledger asset for license {license_id}: {reason}")]
    DecodeFailure { license_id: LicenseId, reason: String },

    /// A ledger read was rejected for a reason other than a missing key.
    #[error("ledger query for license {license_id} failed: {cause}")]
    QueryFailure {
        license_id: LicenseId,
        #[source]
        cause: LedgerError,
    },

    /// Another license already holds this case or number.
    #[error("a license with {field} {value:?} already exists")]
    Duplicate { field: &'static str, value: String },

    /// Deletion refused while the license is in force.
    #[error("license {license_id} is {status} and cannot be deleted")]
    LicenseActive {
        license_id: LicenseId,
        status: BusinessStatus,
    },

    /// Document upload refused on a revoked or expired license.
    #[error("license {license_id} is {status} and cannot receive a document")]
    LicenseInactive {
        license_id: LicenseId,
        status: BusinessStatus,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reading or writing the relational store failed.
    #[error("license store error: {0}")]
    Store(StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for AnchorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Duplicate { field, value } => Self::Duplicate { field, value },
            other => Self::Store(other),
        }
    }
}

impl AnchorError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AssetNotFound(_) => "asset_not_found",
            Self::MissingHashes { .. } => "missing_hashes",
            Self::AlreadySynced(_) => "already_synced",
            Self::LedgerOffline { .. } => "ledger_offline",
            Self::SubmitFailure { .. } => "submit_failure",
            Self::SubmitAndPersistFailure { .. } => "submit_and_persist_failure",
            Self::PersistFailure { .. } => "persist_failure",
            Self::StaleAnchor { .. } => "stale_anchor",
            Self::DecodeFailure { .. } => "decode_failure",
            Self::QueryFailure { .. } => "query_failure",
            Self::Duplicate { .. } => "duplicate",
            Self::LicenseActive { .. } => "license_active",
            Self::LicenseInactive { .. } => "license_inactive",
            Self::Validation(_) => "validation",
            Self::Store(_) => "store",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let id = LicenseId::new();
        assert!(matches!(AnchorError::from(StoreError::NotFound(id)), AnchorError::NotFound(x) if x == id));
    }

    #[test]
    fn store_duplicate_maps_to_duplicate() {
        let err = AnchorError::from(StoreError::Duplicate {
            field: "license_number",
            value: "X-1".into(),
        });
        assert_eq!(err.kind(), "duplicate");
    }

    #[test]
    fn persist_failure_says_which_side_is_ahead() {
        let err = AnchorError::PersistFailure {
            license_id: LicenseId::new(),
            intended: SyncStatus::Synced,
            cause: StoreError::Unavailable("connection reset".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("ledger is ahead of the store"));
        assert!(msg.contains("SYNCED"));
    }
}
