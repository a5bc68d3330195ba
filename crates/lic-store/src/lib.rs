//! # lic-store: License Store
//!
//! Pure data access for [`LicenseRecord`]s. The store knows nothing about
//! the ledger: it persists whatever digests and sync status it is handed.
//! The sync-status state machine is driven by the anchoring coordinator in
//! `lic-anchor`; the store only offers the conditional update that the
//! coordinator's failure path needs.
//!
//! ## Backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemoryLicenseStore`] | Development, tests, and `DATABASE_URL`-less runs |
//! | [`PgLicenseStore`] | PostgreSQL via SQLx, with embedded migrations |
//! | [`StoreBackend`] | Runtime selection between the two |
//!
//! ## Uniqueness
//!
//! A case owns at most one license, and license numbers are unique. Both
//! backends refuse a write that would break either rule with
//! [`StoreError::Duplicate`].

pub mod backend;
pub mod error;
pub mod memory;
pub mod postgres;

use std::future::Future;

use lic_core::{HexDigest, LicenseId, LicenseRecord, SyncStatus};

pub use backend::StoreBackend;
pub use error::StoreError;
pub use memory::MemoryLicenseStore;
pub use postgres::{init_pool, PgLicenseStore};

/// Precondition for a targeted sync-status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncGuard {
    /// Write regardless of the current status.
    Always,
    /// Write only if the current status is not `Synced`. A failed duplicate
    /// anchor must never downgrade a confirmed one.
    UnlessSynced,
    /// Write only if the stored digests are still these. An edit that lands
    /// while a submit is in flight leaves the ledger holding superseded
    /// digests; the record must not be marked `Synced` for them.
    DigestsAre { h1: HexDigest, h2: HexDigest },
}

impl SyncGuard {
    /// Whether `current` may be overwritten.
    pub fn permits(&self, current: &LicenseRecord) -> bool {
        match self {
            Self::Always => true,
            Self::UnlessSynced => current.sync_status != SyncStatus::Synced,
            Self::DigestsAre { h1, h2 } => {
                current.h1.as_ref() == Some(h1) && current.h2.as_ref() == Some(h2)
            }
        }
    }
}

/// Persistence of license records.
///
/// All methods are async; implementations must be safe to share across
/// tasks.
pub trait LicenseStore: Send + Sync {
    /// Insert a new record.
    fn insert(
        &self,
        record: &LicenseRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read a record by id.
    fn get(
        &self,
        id: LicenseId,
    ) -> impl Future<Output = Result<Option<LicenseRecord>, StoreError>> + Send;

    /// Overwrite every mutable field of an existing record, hashes and sync
    /// status included. Fails with [`StoreError::NotFound`] if absent.
    fn update(
        &self,
        record: &LicenseRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a record. Returns whether it existed.
    fn delete(&self, id: LicenseId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All records whose status is one of `statuses`, oldest first.
    fn list_by_sync_status(
        &self,
        statuses: &[SyncStatus],
    ) -> impl Future<Output = Result<Vec<LicenseRecord>, StoreError>> + Send;

    /// Set only the sync status (and `updated_at`). Returns `Ok(false)` when
    /// the guard refused the write; [`StoreError::NotFound`] when the record
    /// is absent.
    fn set_sync_status(
        &self,
        id: LicenseId,
        status: SyncStatus,
        guard: SyncGuard,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<S: LicenseStore> LicenseStore for std::sync::Arc<S> {
    fn insert(
        &self,
        record: &LicenseRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).insert(record)
    }

    fn get(
        &self,
        id: LicenseId,
    ) -> impl Future<Output = Result<Option<LicenseRecord>, StoreError>> + Send {
        (**self).get(id)
    }

    fn update(
        &self,
        record: &LicenseRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).update(record)
    }

    fn delete(&self, id: LicenseId) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).delete(id)
    }

    fn list_by_sync_status(
        &self,
        statuses: &[SyncStatus],
    ) -> impl Future<Output = Result<Vec<LicenseRecord>, StoreError>> + Send {
        (**self).list_by_sync_status(statuses)
    }

    fn set_sync_status(
        &self,
        id: LicenseId,
        status: SyncStatus,
        guard: SyncGuard,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).set_sync_status(id, status, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lic_core::{BusinessStatus, CaseId, LicenseMetadata, Timestamp};

    fn record(status: SyncStatus) -> LicenseRecord {
        let metadata = LicenseMetadata {
            license_type: "food-safety".into(),
            license_number: "FS-1".into(),
            effective_from: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
            effective_until: Timestamp::parse("2029-01-01T00:00:00Z").unwrap(),
            business_status: BusinessStatus::Active,
        };
        let mut record = LicenseRecord::new(CaseId::new(), metadata);
        record.h2 = Some(lic_core::file_digest(&b"scan"[..]).unwrap());
        record.sync_status = status;
        record
    }

    #[test]
    fn unless_synced_guard() {
        assert!(SyncGuard::UnlessSynced.permits(&record(SyncStatus::NotSynced)));
        assert!(SyncGuard::UnlessSynced.permits(&record(SyncStatus::SyncFailed)));
        assert!(!SyncGuard::UnlessSynced.permits(&record(SyncStatus::Synced)));
        assert!(SyncGuard::Always.permits(&record(SyncStatus::Synced)));
    }

    #[test]
    fn digests_guard_refuses_superseded_digests() {
        let current = record(SyncStatus::NotSynced);
        let same = SyncGuard::DigestsAre {
            h1: current.h1.clone().unwrap(),
            h2: current.h2.clone().unwrap(),
        };
        assert!(same.permits(&current));

        let stale = SyncGuard::DigestsAre {
            h1: lic_core::file_digest(&b"old metadata"[..]).unwrap(),
            h2: current.h2.clone().unwrap(),
        };
        assert!(!stale.permits(&current));

        let mut no_document = current.clone();
        no_document.h2 = None;
        assert!(!same.permits(&no_document));
    }
}
