//! # lic-cli: Operator CLI for License Anchoring
//!
//! Provides the `lic` command-line interface.
//!
//! ## Subcommands
//!
//! - `lic hash-file <path>`: h2 of a document.
//! - `lic hash-metadata ...`: h1 of a license's canonical metadata.
//! - `lic ledger-status`: connect with the configured identity and report
//!   whether the client is connected or degraded.
//! - `lic anchor <id>`: push a license's digests to the ledger.
//! - `lic verify <id>`: compare stored digests with the ledger's.
//! - `lic pending`: licenses waiting to be anchored.
//!
//! The last three read the license store at `DATABASE_URL`.
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success; for `verify`, both digests match |
//! | 1 | Error |
//! | 2 | `verify` found drift |
//! | 3 | `ledger-status` found the client degraded |

pub mod anchoring;
pub mod hashing;

/// `verify` found at least one mismatching digest.
pub const EXIT_DRIFT: u8 = 2;
/// `ledger-status` found the client degraded.
pub const EXIT_DEGRADED: u8 = 3;
