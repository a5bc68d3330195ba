//! # Request Extraction Helpers
//!
//! Map extractor rejections and unparsable path segments to [`AppError`]
//! so every malformed request gets the structured error body.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use lic_core::LicenseId;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a `{id}` path segment.
pub fn parse_license_id(raw: &str) -> Result<LicenseId, AppError> {
    raw.parse::<LicenseId>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_id_parses_hyphenated_uuid() {
        let id = LicenseId::new();
        assert_eq!(parse_license_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn garbage_id_is_bad_request() {
        assert!(matches!(parse_license_id("not-a-uuid"), Err(AppError::BadRequest(_))));
    }
}
