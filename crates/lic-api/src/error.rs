//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Anchoring errors keep their kind through to the response code so a
//! client can tell "try again later" (503) from "nothing to do" (409) from
//! "bad data" (422). Internal detail is logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lic_anchor::AnchorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "ALREADY_SYNCED", "LEDGER_OFFLINE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or path could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body exceeds the configured limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// Anchoring, verification, or registry failure.
    #[error(transparent)]
    Anchor(#[from] AnchorError),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Anchor(err) => anchor_status_and_code(err),
        }
    }

    fn is_internal(&self) -> bool {
        self.status_and_code().0.is_server_error()
            && !matches!(self, Self::Anchor(AnchorError::LedgerOffline { .. }))
    }
}

fn anchor_status_and_code(err: &AnchorError) -> (StatusCode, &'static str) {
    use AnchorError as E;
    match err {
        E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        E::AssetNotFound(_) => (StatusCode::NOT_FOUND, "ASSET_NOT_FOUND"),
        E::AlreadySynced(_) => (StatusCode::CONFLICT, "ALREADY_SYNCED"),
        E::MissingHashes { .. } => (StatusCode::CONFLICT, "MISSING_HASHES"),
        E::LicenseActive { .. } => (StatusCode::CONFLICT, "LICENSE_ACTIVE"),
        E::LicenseInactive { .. } => (StatusCode::CONFLICT, "LICENSE_INACTIVE"),
        E::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE"),
        E::StaleAnchor { .. } => (StatusCode::CONFLICT, "STALE_ANCHOR"),
        E::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        E::LedgerOffline { .. } => (StatusCode::SERVICE_UNAVAILABLE, "LEDGER_OFFLINE"),
        E::SubmitFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SUBMIT_FAILURE"),
        E::SubmitAndPersistFailure { .. } | E::PersistFailure { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "PERSIST_FAILURE")
        }
        E::DecodeFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "DECODE_FAILURE"),
        E::QueryFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "QUERY_FAILURE"),
        E::Store(_) | E::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, code, "request failed");
            "An internal error occurred".to_string()
        } else {
            if status == StatusCode::SERVICE_UNAVAILABLE {
                tracing::warn!(error = %self, "ledger unavailable");
            }
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<lic_core::ValidationError> for AppError {
    fn from(err: lic_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("ledger task aborted: {err}"))
    }
}
