//! # lic-core: Foundational Types for License Anchoring
//!
//! The leaf crate of the workspace. Defines the license record as it lives in
//! the relational store, the synchronization status it carries, and the two
//! content digests that bind it to the external ledger:
//!
//! - **h1**: SHA-256 over the license's canonical metadata fields, in a
//!   fixed order ([`LicenseMetadata::canonical_fields`]).
//! - **h2**: SHA-256 over the byte content of the supporting document,
//!   computed by streaming ([`FileHasher`], [`file_digest`]).
//!
//! Both digests are rendered as lowercase hex and wrapped in [`HexDigest`],
//! which validates its shape on construction.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lic-*` crates.
//! - No I/O beyond reading the byte stream handed to the file hasher.
//! - No `.unwrap()` outside tests.
//! - The canonical field order is part of the persisted contract. Changing it
//!   invalidates every `h1` already stored or anchored.

pub mod digest;
pub mod error;
pub mod identity;
pub mod license;
pub mod temporal;

pub use digest::{file_digest, file_digest_path, metadata_digest, FileHasher, HexDigest};
pub use error::ValidationError;
pub use identity::{CaseId, LicenseId};
pub use license::{BusinessStatus, LicenseMetadata, LicenseRecord, SyncStatus};
pub use temporal::Timestamp;
