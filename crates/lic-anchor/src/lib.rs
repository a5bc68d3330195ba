//! # lic-anchor: License Integrity Anchoring
//!
//! Binds a mutable license record to an immutable ledger entry through two
//! digests (h1 over metadata, h2 over the supporting document), and checks
//! that the two stores still agree.
//!
//! ## Components
//!
//! - [`AnchorCoordinator`]: `push_to_ledger`: precondition checks, ledger
//!   submit, status write.
//! - [`Verifier`]: `verify_license`: read both stores, report agreement.
//! - [`LicenseRegistry`]: record lifecycle that keeps h1/h2 current.
//!
//! All three are generic over [`lic_store::LicenseStore`] and (for the
//! first two) [`lic_ledger::LedgerClient`], so tests inject in-memory
//! doubles and binaries inject the runtime-selected backends.
//!
//! ## Consistency
//!
//! The ledger write and the status write are not transactional. Every
//! window where the two disagree surfaces as its own [`AnchorError`]
//! variant and is logged at `error` level. Nothing is rolled back: a
//! committed ledger write cannot be.

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod verifier;

use std::time::Duration;

pub use coordinator::{AnchorCoordinator, AnchorReceipt};
pub use error::AnchorError;
pub use registry::{DriftPolicy, LicenseRegistry};
pub use verifier::{VerificationReport, Verifier};

/// Ledger call deadline when none is configured.
pub const DEFAULT_LEDGER_DEADLINE: Duration = Duration::from_secs(30);
