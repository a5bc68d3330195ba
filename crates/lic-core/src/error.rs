//! # Validation Errors
//!
//! Errors raised when constructing core values from untrusted input
//! (request bodies, database rows, ledger payloads).

use thiserror::Error;

/// A value failed validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace-only.
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// A digest string was not 64 lowercase hex characters.
    #[error("invalid digest {0:?}: expected 64 lowercase hex characters")]
    InvalidDigest(String),

    /// The effective window ends before it starts.
    #[error("effective window is inverted: {from} is after {until}")]
    InvertedWindow {
        /// Start of the window, RFC 3339.
        from: String,
        /// End of the window, RFC 3339.
        until: String,
    },

    /// A status tag did not name a known variant.
    #[error("unknown {kind} tag {value:?}")]
    UnknownTag {
        /// Which enumeration was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A timestamp string could not be parsed or was not UTC.
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    /// An identifier string was not a UUID.
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}
