//! # In-Memory License Store
//!
//! A `parking_lot::RwLock` over a `HashMap`. The lock is never held across
//! an `.await`, so every operation completes synchronously inside its
//! future. Uniqueness checks and the write they guard happen under a single
//! write lock.
//!
//! [`MemoryLicenseStore::fail_writes`] switches every mutating call to
//! [`StoreError::Unavailable`], which lets tests reach the persist-failure
//! paths of the anchoring coordinator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lic_core::{LicenseId, LicenseRecord, SyncStatus};
use parking_lot::RwLock;

use crate::{LicenseStore, StoreError, SyncGuard};

#[derive(Debug, Clone, Default)]
pub struct MemoryLicenseStore {
    records: Arc<RwLock<HashMap<LicenseId, LicenseRecord>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

/// Reject `candidate` if another record shares its case or license number.
fn check_unique(
    records: &HashMap<LicenseId, LicenseRecord>,
    candidate: &LicenseRecord,
) -> Result<(), StoreError> {
    for other in records.values().filter(|r| r.id != candidate.id) {
        if other.case_id == candidate.case_id {
            return Err(StoreError::Duplicate {
                field: "case_id",
                value: candidate.case_id.to_string(),
            });
        }
        if other.metadata.license_number == candidate.metadata.license_number {
            return Err(StoreError::Duplicate {
                field: "license_number",
                value: candidate.metadata.license_number.clone(),
            });
        }
    }
    Ok(())
}

impl LicenseStore for MemoryLicenseStore {
    async fn insert(&self, record: &LicenseRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut guard = self.records.write();
        if guard.contains_key(&record.id) {
            return Err(StoreError::Duplicate {
                field: "id",
                value: record.id.to_string(),
            });
        }
        check_unique(&guard, record)?;
        guard.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: LicenseId) -> Result<Option<LicenseRecord>, StoreError> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn update(&self, record: &LicenseRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut guard = self.records.write();
        if !guard.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id));
        }
        check_unique(&guard, record)?;
        guard.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete(&self, id: LicenseId) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.records.write().remove(&id).is_some())
    }

    async fn list_by_sync_status(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<LicenseRecord>, StoreError> {
        let mut out: Vec<LicenseRecord> = self
            .records
            .read()
            .values()
            .filter(|r| statuses.contains(&r.sync_status))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    async fn set_sync_status(
        &self,
        id: LicenseId,
        status: SyncStatus,
        guard: SyncGuard,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !guard.permits(record) {
            return Ok(false);
        }
        record.sync_status = status;
        record.touch();
        Ok(true)
    }
}
