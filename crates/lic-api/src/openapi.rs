//! # OpenAPI Document Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document, served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "License Integrity Anchoring API",
        description = "License records with metadata (h1) and document (h2) digests, anchored on a permissioned ledger and verified against it.\n\nA `SYNCED` status is the store's local claim; `/verification` is the check that the ledger agrees."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Licenses ─────────────────────────────────────────────────────
        crate::routes::licenses::create_license,
        crate::routes::licenses::list_licenses,
        crate::routes::licenses::get_license,
        crate::routes::licenses::update_license,
        crate::routes::licenses::delete_license,
        crate::routes::licenses::upload_document,
        crate::routes::licenses::download_document,
        // ── Anchoring ────────────────────────────────────────────────────
        crate::routes::anchoring::anchor_license,
        crate::routes::anchoring::verify_license,
        crate::routes::anchoring::list_pending,
        crate::routes::anchoring::ledger_status,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::licenses::MetadataRequest,
        crate::routes::licenses::CreateLicenseRequest,
        crate::routes::licenses::LicenseResponse,
        crate::routes::anchoring::AnchorResponse,
        crate::routes::anchoring::VerificationResponse,
        crate::routes::anchoring::LedgerStatusResponse,
    )),
    tags(
        (name = "licenses", description = "License records and documents"),
        (name = "anchoring", description = "Ledger anchoring and verification"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
