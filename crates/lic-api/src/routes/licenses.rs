//! # License Routes
//!
//! License CRUD and document upload. Handlers delegate to
//! [`lic_anchor::LicenseRegistry`]; this module only owns the request and
//! response shapes and the on-disk location of uploaded documents.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use lic_core::{
    BusinessStatus, CaseId, FileHasher, HexDigest, LicenseMetadata, LicenseRecord, SyncStatus,
    Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_json, parse_license_id};
use crate::state::AppState;

// ─── Request / Response Types ────────────────────────────────────────

/// License metadata as sent by clients. Dates are RFC 3339.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MetadataRequest {
    pub license_type: String,
    pub license_number: String,
    /// e.g. `2026-01-01T00:00:00Z`
    pub effective_from: String,
    pub effective_until: String,
    /// `ACTIVE`, `EXPIRING_SOON`, `EXPIRED`, or `REVOKED`.
    pub business_status: String,
}

impl MetadataRequest {
    fn into_metadata(self) -> Result<LicenseMetadata, ValidationError> {
        let metadata = LicenseMetadata {
            license_type: self.license_type,
            license_number: self.license_number,
            effective_from: Timestamp::parse(&self.effective_from)?,
            effective_until: Timestamp::parse(&self.effective_until)?,
            business_status: self.business_status.parse::<BusinessStatus>()?,
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLicenseRequest {
    /// The case file this license is issued under. One license per case.
    pub case_id: Uuid,
    #[serde(flatten)]
    pub metadata: MetadataRequest,
}

/// A license record with its digests and sync claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LicenseResponse {
    pub id: Uuid,
    pub case_id: Uuid,
    pub license_type: String,
    pub license_number: String,
    pub effective_from: String,
    pub effective_until: String,
    pub business_status: String,
    pub file_path: Option<String>,
    pub h1_hash: Option<String>,
    pub h2_hash: Option<String>,
    pub sync_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LicenseRecord> for LicenseResponse {
    fn from(record: LicenseRecord) -> Self {
        Self {
            id: record.id.0,
            case_id: record.case_id.0,
            license_type: record.metadata.license_type,
            license_number: record.metadata.license_number,
            effective_from: record.metadata.effective_from.to_rfc3339(),
            effective_until: record.metadata.effective_until.to_rfc3339(),
            business_status: record.metadata.business_status.as_str().to_string(),
            file_path: record.file_path,
            h1_hash: record.h1.map(|h| h.to_string()),
            h2_hash: record.h2.map(|h| h.to_string()),
            sync_status: record.sync_status.as_str().to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Comma-separated sync statuses, e.g. `NOT_SYNCED,SYNC_FAILED`.
    /// All statuses when absent.
    pub sync_status: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Original file name. Only its final component is kept.
    pub filename: Option<String>,
}

// ─── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/licenses", get(list_licenses).post(create_license))
        .route(
            "/v1/licenses/{id}",
            get(get_license).put(update_license).delete(delete_license),
        )
        .route(
            "/v1/licenses/{id}/document",
            get(download_document).put(upload_document),
        )
}

// ─── Handlers ────────────────────────────────────────────────────────

/// POST /v1/licenses: Create a license and compute its h1.
#[utoipa::path(
    post,
    path = "/v1/licenses",
    request_body = CreateLicenseRequest,
    responses(
        (status = 201, description = "License created", body = LicenseResponse),
        (status = 409, description = "Case already licensed or number taken", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid metadata", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
async fn create_license(
    State(state): State<AppState>,
    body: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LicenseResponse>), AppError> {
    let req = extract_json(body)?;
    let metadata = req.metadata.into_metadata()?;
    let record = state
        .registry
        .create_license(CaseId(req.case_id), metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /v1/licenses: List licenses, optionally filtered by sync status.
#[utoipa::path(
    get,
    path = "/v1/licenses",
    params(ListQuery),
    responses(
        (status = 200, description = "Licenses, oldest first", body = Vec<LicenseResponse>),
        (status = 422, description = "Unknown sync status", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
async fn list_licenses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LicenseResponse>>, AppError> {
    let statuses = parse_statuses(query.sync_status.as_deref())?;
    let records = state.registry.list_by_sync_status(&statuses).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<SyncStatus>, ValidationError> {
    let all = vec![SyncStatus::NotSynced, SyncStatus::Synced, SyncStatus::SyncFailed];
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(all);
    };
    raw.split(',')
        .map(|tag| tag.trim().parse::<SyncStatus>())
        .collect()
}

/// GET /v1/licenses/{id}
#[utoipa::path(
    get,
    path = "/v1/licenses/{id}",
    params(("id" = Uuid, Path, description = "License ID")),
    responses(
        (status = 200, description = "License found", body = LicenseResponse),
        (status = 404, description = "License not found", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LicenseResponse>, AppError> {
    let id = parse_license_id(&id)?;
    let record = state.registry.get_license(id).await?;
    Ok(Json(record.into()))
}

/// PUT /v1/licenses/{id}: Replace metadata and recompute h1.
#[utoipa::path(
    put,
    path = "/v1/licenses/{id}",
    params(("id" = Uuid, Path, description = "License ID")),
    request_body = MetadataRequest,
    responses(
        (status = 200, description = "License updated", body = LicenseResponse),
        (status = 404, description = "License not found", body = crate::error::ErrorBody),
        (status = 409, description = "License number taken", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid metadata", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
async fn update_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<MetadataRequest>, JsonRejection>,
) -> Result<Json<LicenseResponse>, AppError> {
    let id = parse_license_id(&id)?;
    let metadata = extract_json(body)?.into_metadata()?;
    let record = state.registry.update_metadata(id, metadata).await?;
    Ok(Json(record.into()))
}

/// DELETE /v1/licenses/{id}: Delete a license that is no longer in force,
/// together with its stored documents.
#[utoipa::path(
    delete,
    path = "/v1/licenses/{id}",
    params(("id" = Uuid, Path, description = "License ID")),
    responses(
        (status = 204, description = "License deleted"),
        (status = 404, description = "License not found", body = crate::error::ErrorBody),
        (status = 409, description = "License still in force", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
async fn delete_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_license_id(&id)?;
    let record = state.registry.delete_license(id).await?;
    if let Some(path) = record.file_path {
        remove_file_quietly(FsPath::new(&path)).await;
    }
    let dir = state.license_dir(id);
    if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(license_id = %id, dir = %dir.display(), error = %e, "could not remove document directory");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/licenses/{id}/document: Store a document and record its h2.
///
/// The body is the raw document. It is hashed chunk by chunk as it is
/// written to disk, never buffered whole. A previously stored document is
/// removed once the new one is recorded.
#[utoipa::path(
    put,
    path = "/v1/licenses/{id}/document",
    params(("id" = Uuid, Path, description = "License ID"), UploadQuery),
    responses(
        (status = 200, description = "Document stored, h2 recorded", body = LicenseResponse),
        (status = 404, description = "License not found", body = crate::error::ErrorBody),
        (status = 409, description = "License revoked or expired", body = crate::error::ErrorBody),
        (status = 413, description = "Document exceeds the upload limit", body = crate::error::ErrorBody),
        (status = 422, description = "Empty document", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Body,
) -> Result<Json<LicenseResponse>, AppError> {
    let id = parse_license_id(&id)?;
    let existing = state.registry.ensure_accepts_document(id).await?;

    let dir = state.license_dir(id);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!(
        "{}-{}",
        Uuid::new_v4(),
        sanitize_file_name(query.filename.as_deref())
    ));

    let h2 = match stream_to_file(body, &path, state.config.max_upload_bytes).await {
        Ok((_, 0)) => {
            remove_file_quietly(&path).await;
            return Err(AppError::Validation("document body is empty".into()));
        }
        Ok((h2, bytes)) => {
            tracing::debug!(license_id = %id, bytes, "document received");
            h2
        }
        Err(e) => {
            remove_file_quietly(&path).await;
            return Err(e);
        }
    };

    let stored = path.to_string_lossy().into_owned();
    let record = match state.registry.record_document(id, h2, stored.clone()).await {
        Ok(record) => record,
        Err(e) => {
            remove_file_quietly(&path).await;
            return Err(e.into());
        }
    };

    if let Some(old) = existing.file_path.filter(|old| *old != stored) {
        remove_file_quietly(FsPath::new(&old)).await;
    }
    tracing::info!(license_id = %id, "document stored");
    Ok(Json(record.into()))
}

/// Write `body` to `path`, feeding each chunk to the file hasher on the way.
/// Returns the digest and the byte count.
async fn stream_to_file(
    body: Body,
    path: &FsPath,
    limit: usize,
) -> Result<(HexDigest, u64), AppError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut hasher = FileHasher::new();
    let mut received: u64 = 0;

    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk =
            chunk.map_err(|e| AppError::BadRequest(format!("failed to read document body: {e}")))?;
        received += chunk.len() as u64;
        if received > limit as u64 {
            return Err(AppError::PayloadTooLarge(format!(
                "document exceeds {limit} bytes"
            )));
        }
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok((hasher.finalize(), received))
}

/// GET /v1/licenses/{id}/document: Return the stored document bytes.
#[utoipa::path(
    get,
    path = "/v1/licenses/{id}/document",
    params(("id" = Uuid, Path, description = "License ID")),
    responses(
        (status = 200, description = "Document bytes (application/octet-stream)"),
        (status = 404, description = "License or document not found", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_license_id(&id)?;
    let record = state.registry.get_license(id).await?;
    let path = record
        .file_path
        .ok_or_else(|| AppError::NotFound(format!("license {id} has no document")))?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(license_id = %id, path = %path, "recorded document missing on disk");
            return Err(AppError::NotFound(format!("document for license {id} is missing")));
        }
        Err(e) => return Err(e.into()),
    };
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Keep the final path component and replace anything outside
/// `[A-Za-z0-9._-]`.
fn sanitize_file_name(raw: Option<&str>) -> String {
    let base = raw
        .and_then(|name| FsPath::new(name).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

async fn remove_file_quietly(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "could not remove stored document");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name(Some("../../etc/passwd")), "passwd");
        assert_eq!(sanitize_file_name(Some("permit (1).pdf")), "permit__1_.pdf");
        assert_eq!(sanitize_file_name(Some("..")), "document");
        assert_eq!(sanitize_file_name(None), "document");
    }

    #[test]
    fn statuses_default_to_all() {
        assert_eq!(parse_statuses(None).unwrap().len(), 3);
        assert_eq!(parse_statuses(Some(" ")).unwrap().len(), 3);
        assert_eq!(
            parse_statuses(Some("NOT_SYNCED, SYNC_FAILED")).unwrap(),
            vec![SyncStatus::NotSynced, SyncStatus::SyncFailed]
        );
        assert!(parse_statuses(Some("PENDING")).is_err());
    }

    #[test]
    fn metadata_request_rejects_bad_dates() {
        let req = MetadataRequest {
            license_type: "food-safety".into(),
            license_number: "FS-1".into(),
            effective_from: "yesterday".into(),
            effective_until: "2029-01-01T00:00:00Z".into(),
            business_status: "ACTIVE".into(),
        };
        assert!(req.into_metadata().is_err());
    }

    #[test]
    fn response_carries_string_tags() {
        let metadata = MetadataRequest {
            license_type: "food-safety".into(),
            license_number: "FS-1".into(),
            effective_from: "2026-01-01T00:00:00Z".into(),
            effective_until: "2029-01-01T00:00:00Z".into(),
            business_status: "EXPIRING_SOON".into(),
        }
        .into_metadata()
        .unwrap();
        let response = LicenseResponse::from(LicenseRecord::new(CaseId::new(), metadata));
        assert_eq!(response.sync_status, "NOT_SYNCED");
        assert_eq!(response.business_status, "EXPIRING_SOON");
        assert_eq!(response.effective_from, "2026-01-01T00:00:00Z");
        assert!(response.h1_hash.is_some());
        assert!(response.h2_hash.is_none());
    }
}
