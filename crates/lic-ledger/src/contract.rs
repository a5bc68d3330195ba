//! # Ledger Operation Surface
//!
//! The chaincode stores one JSON entry per license id, overwritten on every
//! successful anchor:
//!
//! ```json
//! {"id": "<license id>", "h1Hash": "<hex>", "h2Hash": "<hex>"}
//! ```
//!
//! - `AnchorLicense(id, h1, h2)` writes the entry (last write wins).
//! - `QueryLicense(id)` returns it, or fails with not-found.

use serde::{Deserialize, Serialize};

/// Write the digests for a license.
pub const ANCHOR_LICENSE: &str = "AnchorLicense";

/// Read the digests for a license.
pub const QUERY_LICENSE: &str = "QueryLicense";

/// The ledger's copy of a license's digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAsset {
    pub id: String,
    pub h1_hash: String,
    pub h2_hash: String,
}

impl LedgerAsset {
    /// Arguments of the `AnchorLicense` call that writes this asset.
    pub fn anchor_args(&self) -> Vec<String> {
        vec![self.id.clone(), self.h1_hash.clone(), self.h2_hash.clone()]
    }

    /// Parse a `QueryLicense` result.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
