//! # API Route Modules
//!
//! - `licenses`: license CRUD and document upload/download.
//! - `anchoring`: push to ledger, verification, pending anchors, ledger
//!   status. Ledger calls run on their own task so a slow gateway never
//!   blocks the request-serving path.

pub mod anchoring;
pub mod licenses;
