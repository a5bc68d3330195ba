//! # PostgreSQL License Store
//!
//! All queries run against the `licenses` table created by
//! `migrations/0001_licenses.sql`. Status transitions are validated by the
//! caller; the only state logic in SQL is the guard on
//! [`LicenseStore::set_sync_status`], which runs as a single conditional
//! `UPDATE` so concurrent anchors cannot interleave a read and a write.

use chrono::{DateTime, Utc};
use lic_core::{
    BusinessStatus, CaseId, HexDigest, LicenseId, LicenseMetadata, LicenseRecord, SyncStatus,
    Timestamp,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::{LicenseStore, StoreError, SyncGuard};

const SELECT_COLUMNS: &str = "SELECT id, case_id, license_type, license_number, effective_from, \
     effective_until, business_status, file_path, h1_hash, h2_hash, sync_status, created_at, \
     updated_at FROM licenses";

/// Connect to `DATABASE_URL` and apply migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory mode).
/// Returns `Err` if the URL is set but connecting or migrating fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()) {
        Some(url) => url,
        None => {
            tracing::warn!(
                "DATABASE_URL not set; using the in-memory license store. \
                 Records will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("license store migrations applied");

    Ok(Some(pool))
}

/// License store backed by a `PgPool`.
#[derive(Debug, Clone)]
pub struct PgLicenseStore {
    pool: PgPool,
}

impl PgLicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translate a unique-constraint violation into [`StoreError::Duplicate`].
fn map_write_error(err: sqlx::Error, record: &LicenseRecord) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("licenses_case_id_key") => StoreError::Duplicate {
                    field: "case_id",
                    value: record.case_id.to_string(),
                },
                Some("licenses_license_number_key") => StoreError::Duplicate {
                    field: "license_number",
                    value: record.metadata.license_number.clone(),
                },
                _ => StoreError::Duplicate {
                    field: "id",
                    value: record.id.to_string(),
                },
            };
        }
    }
    StoreError::Database(err)
}

impl LicenseStore for PgLicenseStore {
    async fn insert(&self, record: &LicenseRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO licenses (id, case_id, license_type, license_number, effective_from,
                 effective_until, business_status, file_path, h1_hash, h2_hash, sync_status,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(record.id.0)
        .bind(record.case_id.0)
        .bind(&record.metadata.license_type)
        .bind(&record.metadata.license_number)
        .bind(record.metadata.effective_from.as_datetime())
        .bind(record.metadata.effective_until.as_datetime())
        .bind(record.metadata.business_status.as_str())
        .bind(record.file_path.as_deref())
        .bind(record.h1.as_ref().map(HexDigest::as_str))
        .bind(record.h2.as_ref().map(HexDigest::as_str))
        .bind(record.sync_status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, record))?;
        Ok(())
    }

    async fn get(&self, id: LicenseId) -> Result<Option<LicenseRecord>, StoreError> {
        let row = sqlx::query_as::<_, LicenseRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LicenseRow::into_record).transpose()
    }

    async fn update(&self, record: &LicenseRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE licenses SET license_type = $1, license_number = $2, effective_from = $3,
                 effective_until = $4, business_status = $5, file_path = $6, h1_hash = $7,
                 h2_hash = $8, sync_status = $9, updated_at = $10
             WHERE id = $11",
        )
        .bind(&record.metadata.license_type)
        .bind(&record.metadata.license_number)
        .bind(record.metadata.effective_from.as_datetime())
        .bind(record.metadata.effective_until.as_datetime())
        .bind(record.metadata.business_status.as_str())
        .bind(record.file_path.as_deref())
        .bind(record.h1.as_ref().map(HexDigest::as_str))
        .bind(record.h2.as_ref().map(HexDigest::as_str))
        .bind(record.sync_status.as_str())
        .bind(record.updated_at)
        .bind(record.id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, record))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(record.id));
        }
        Ok(())
    }

    async fn delete(&self, id: LicenseId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM licenses WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_sync_status(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<LicenseRecord>, StoreError> {
        let tags: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, LicenseRow>(&format!(
            "{SELECT_COLUMNS} WHERE sync_status = ANY($1) ORDER BY created_at"
        ))
        .bind(&tags)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LicenseRow::into_record).collect()
    }

    async fn set_sync_status(
        &self,
        id: LicenseId,
        status: SyncStatus,
        guard: SyncGuard,
    ) -> Result<bool, StoreError> {
        let sql = match &guard {
            SyncGuard::Always => {
                "UPDATE licenses SET sync_status = $1, updated_at = $2 WHERE id = $3"
            }
            SyncGuard::UnlessSynced => {
                "UPDATE licenses SET sync_status = $1, updated_at = $2
                 WHERE id = $3 AND sync_status <> 'SYNCED'"
            }
            SyncGuard::DigestsAre { .. } => {
                "UPDATE licenses SET sync_status = $1, updated_at = $2
                 WHERE id = $3 AND h1_hash = $4 AND h2_hash = $5"
            }
        };
        let mut query = sqlx::query(sql)
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id.0);
        if let SyncGuard::DigestsAre { h1, h2 } = &guard {
            query = query.bind(h1.as_str().to_owned()).bind(h2.as_str().to_owned());
        }
        let result = query.execute(&self.pool).await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Zero rows: either absent, or present and refused by the guard.
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM licenses WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct LicenseRow {
    id: Uuid,
    case_id: Uuid,
    license_type: String,
    license_number: String,
    effective_from: DateTime<Utc>,
    effective_until: DateTime<Utc>,
    business_status: String,
    file_path: Option<String>,
    h1_hash: Option<String>,
    h2_hash: Option<String>,
    sync_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LicenseRow {
    /// An unknown tag or malformed digest is [`StoreError::Corrupt`], never
    /// a default value.
    fn into_record(self) -> Result<LicenseRecord, StoreError> {
        let id = LicenseId(self.id);
        let corrupt = |reason: String| {
            tracing::error!(license_id = %id, %reason, "corrupt license row");
            StoreError::Corrupt { id, reason }
        };

        let business_status: BusinessStatus =
            self.business_status.parse().map_err(|e| corrupt(format!("{e}")))?;
        let sync_status: SyncStatus =
            self.sync_status.parse().map_err(|e| corrupt(format!("{e}")))?;
        let h1 = self
            .h1_hash
            .as_deref()
            .map(HexDigest::parse)
            .transpose()
            .map_err(|e| corrupt(format!("h1_hash: {e}")))?;
        let h2 = self
            .h2_hash
            .as_deref()
            .map(HexDigest::parse)
            .transpose()
            .map_err(|e| corrupt(format!("h2_hash: {e}")))?;

        Ok(LicenseRecord {
            id,
            case_id: CaseId(self.case_id),
            metadata: LicenseMetadata {
                license_type: self.license_type,
                license_number: self.license_number,
                effective_from: Timestamp::from_utc(self.effective_from),
                effective_until: Timestamp::from_utc(self.effective_until),
                business_status,
            },
            file_path: self.file_path,
            h1,
            h2,
            sync_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
