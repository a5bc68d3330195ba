//! # Anchoring Routes
//!
//! Push a license's digests to the ledger, compare them against the
//! ledger's copy, list what is still waiting, and report the ledger
//! client's connection state.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lic_anchor::{AnchorReceipt, VerificationReport};
use lic_ledger::LedgerClient;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::parse_license_id;
use crate::routes::licenses::LicenseResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnchorResponse {
    pub license_id: Uuid,
    pub h1_hash: String,
    pub h2_hash: String,
    pub sync_status: String,
    pub anchored_at: DateTime<Utc>,
}

impl From<AnchorReceipt> for AnchorResponse {
    fn from(receipt: AnchorReceipt) -> Self {
        Self {
            license_id: receipt.license_id.0,
            h1_hash: receipt.h1.to_string(),
            h2_hash: receipt.h2.to_string(),
            sync_status: lic_core::SyncStatus::Synced.as_str().to_string(),
            anchored_at: receipt.anchored_at,
        }
    }
}

/// Stored digests against the ledger's, with one verdict per digest.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationResponse {
    pub license_id: Uuid,
    pub sync_status: String,
    pub h1_local: Option<String>,
    pub h2_local: Option<String>,
    pub h1_ledger: Option<String>,
    pub h2_ledger: Option<String>,
    pub h1_matches: bool,
    pub h2_matches: bool,
    pub message: String,
}

impl From<VerificationReport> for VerificationResponse {
    fn from(report: VerificationReport) -> Self {
        Self {
            license_id: report.license_id.0,
            sync_status: report.sync_status.as_str().to_string(),
            h1_local: report.h1_local,
            h2_local: report.h2_local,
            h1_ledger: report.h1_ledger,
            h2_ledger: report.h2_ledger,
            h1_matches: report.h1_matches,
            h2_matches: report.h2_matches,
            message: report.message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerStatusResponse {
    /// `gateway` or `memory`.
    pub backend: String,
    pub degraded: bool,
    pub reason: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/licenses/pending", get(list_pending))
        .route("/v1/licenses/{id}/anchor", post(anchor_license))
        .route("/v1/licenses/{id}/verification", get(verify_license))
        .route("/v1/ledger/status", get(ledger_status))
}

/// POST /v1/licenses/{id}/anchor: Write h1/h2 to the ledger.
#[utoipa::path(
    post,
    path = "/v1/licenses/{id}/anchor",
    params(("id" = Uuid, Path, description = "License ID")),
    responses(
        (status = 200, description = "Anchored and marked SYNCED", body = AnchorResponse),
        (status = 404, description = "License not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already synced, digests missing, or digests changed during the anchor", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger offline; nothing changed", body = crate::error::ErrorBody),
        (status = 500, description = "Submit or status write failed", body = crate::error::ErrorBody),
    ),
    tag = "anchoring"
)]
async fn anchor_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnchorResponse>, AppError> {
    let id = parse_license_id(&id)?;
    let coordinator = state.coordinator.clone();
    let receipt = tokio::spawn(async move { coordinator.push_to_ledger(id).await }).await??;
    Ok(Json(receipt.into()))
}

/// GET /v1/licenses/{id}/verification: Compare stored digests with the
/// ledger. Read-only.
#[utoipa::path(
    get,
    path = "/v1/licenses/{id}/verification",
    params(("id" = Uuid, Path, description = "License ID")),
    responses(
        (status = 200, description = "Comparison report", body = VerificationResponse),
        (status = 404, description = "License or ledger asset not found", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger offline", body = crate::error::ErrorBody),
    ),
    tag = "anchoring"
)]
async fn verify_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VerificationResponse>, AppError> {
    let id = parse_license_id(&id)?;
    let verifier = state.verifier.clone();
    let report = tokio::spawn(async move { verifier.verify_license(id).await }).await??;
    Ok(Json(report.into()))
}

/// GET /v1/licenses/pending: Licenses with both digests that are not yet
/// anchored or whose last anchor failed.
#[utoipa::path(
    get,
    path = "/v1/licenses/pending",
    responses(
        (status = 200, description = "Pending licenses, oldest first", body = Vec<LicenseResponse>),
    ),
    tag = "anchoring"
)]
async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<LicenseResponse>>, AppError> {
    let records = state.registry.pending_anchors().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /v1/ledger/status
#[utoipa::path(
    get,
    path = "/v1/ledger/status",
    responses(
        (status = 200, description = "Ledger client state", body = LedgerStatusResponse),
    ),
    tag = "anchoring"
)]
async fn ledger_status(State(state): State<AppState>) -> Json<LedgerStatusResponse> {
    let ledger = state.ledger();
    Json(LedgerStatusResponse {
        backend: ledger.name().to_string(),
        degraded: ledger.is_degraded(),
        reason: ledger.degraded_reason(),
    })
}
