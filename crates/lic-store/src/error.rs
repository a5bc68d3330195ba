//! Store error types.

use lic_core::LicenseId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with this id.
    #[error("license {0} not found")]
    NotFound(LicenseId),

    /// A uniqueness rule would be broken.
    #[error("a license with {field} {value:?} already exists")]
    Duplicate {
        /// `"case_id"` or `"license_number"`.
        field: &'static str,
        value: String,
    },

    /// A persisted row could not be mapped back to a record.
    #[error("license {id} has a corrupt row: {reason}")]
    Corrupt { id: LicenseId, reason: String },

    /// The backend refused or could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
