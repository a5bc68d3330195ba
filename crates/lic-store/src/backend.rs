//! Runtime selection between store backends.
//!
//! Binaries decide at startup whether `DATABASE_URL` is set; everything
//! downstream takes a concrete [`StoreBackend`] and keeps static dispatch.

use lic_core::{LicenseId, LicenseRecord, SyncStatus};

use crate::{LicenseStore, MemoryLicenseStore, PgLicenseStore, StoreError, SyncGuard};

#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory(MemoryLicenseStore),
    Postgres(PgLicenseStore),
}

impl StoreBackend {
    /// A fresh in-memory backend.
    pub fn memory() -> Self {
        Self::Memory(MemoryLicenseStore::new())
    }

    /// PostgreSQL if a pool is given, otherwise in-memory.
    pub fn from_pool(pool: Option<sqlx::PgPool>) -> Self {
        match pool {
            Some(pool) => Self::Postgres(PgLicenseStore::new(pool)),
            None => Self::memory(),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl LicenseStore for StoreBackend {
    async fn insert(&self, record: &LicenseRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.insert(record).await,
            Self::Postgres(s) => s.insert(record).await,
        }
    }

    async fn get(&self, id: LicenseId) -> Result<Option<LicenseRecord>, StoreError> {
        match self {
            Self::Memory(s) => s.get(id).await,
            Self::Postgres(s) => s.get(id).await,
        }
    }

    async fn update(&self, record: &LicenseRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.update(record).await,
            Self::Postgres(s) => s.update(record).await,
        }
    }

    async fn delete(&self, id: LicenseId) -> Result<bool, StoreError> {
        match self {
            Self::Memory(s) => s.delete(id).await,
            Self::Postgres(s) => s.delete(id).await,
        }
    }

    async fn list_by_sync_status(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<LicenseRecord>, StoreError> {
        match self {
            Self::Memory(s) => s.list_by_sync_status(statuses).await,
            Self::Postgres(s) => s.list_by_sync_status(statuses).await,
        }
    }

    async fn set_sync_status(
        &self,
        id: LicenseId,
        status: SyncStatus,
        guard: SyncGuard,
    ) -> Result<bool, StoreError> {
        match self {
            Self::Memory(s) => s.set_sync_status(id, status, guard).await,
            Self::Postgres(s) => s.set_sync_status(id, status, guard).await,
        }
    }
}
