//! # License Records
//!
//! The relational view of a license: mutable administrative metadata, the
//! two digests that bind it to the ledger, and the local synchronization
//! claim.
//!
//! ## Sync Status
//!
//! ```text
//! NotSynced ──▶ Synced ◀──┐
//!     │                   │
//!     └──▶ SyncFailed ────┘
//!            │   ▲
//!            └───┘ (retry failure)
//! ```
//!
//! `Synced` is a claim made after a confirmed ledger write, not a guarantee.
//! Only the anchoring coordinator moves a record along these edges. The
//! registry may additionally reset a record to `NotSynced` when its digests
//! change and the drift policy asks for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::{metadata_digest, HexDigest};
use crate::error::ValidationError;
use crate::identity::{CaseId, LicenseId};
use crate::temporal::Timestamp;

// ─── Business Status ─────────────────────────────────────────────────

/// Administrative status of the license, owned by case management.
///
/// The tag string is one of the metadata fields hashed into h1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessStatus {
    /// In force.
    Active,
    /// In force, nearing the end of its effective window.
    ExpiringSoon,
    /// Past its effective window.
    Expired,
    /// Withdrawn by the issuing authority.
    Revoked,
}

impl BusinessStatus {
    /// Stable tag, as stored and hashed.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::ExpiringSoon => "EXPIRING_SOON",
            Self::Expired => "EXPIRED",
            Self::Revoked => "REVOKED",
        }
    }

    /// Whether the license currently denotes active validity. Such licenses
    /// may not be deleted.
    pub fn is_in_force(&self) -> bool {
        matches!(self, Self::Active | Self::ExpiringSoon)
    }

    /// Whether the license is withdrawn or lapsed. Such licenses may not
    /// receive a new supporting document.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Revoked)
    }
}

impl std::fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BusinessStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "EXPIRING_SOON" => Ok(Self::ExpiringSoon),
            "EXPIRED" => Ok(Self::Expired),
            "REVOKED" => Ok(Self::Revoked),
            other => Err(ValidationError::UnknownTag {
                kind: "business status",
                value: other.to_string(),
            }),
        }
    }
}

// ─── Sync Status ─────────────────────────────────────────────────────

/// The relational store's local claim about ledger anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Never anchored, or reset after a digest change.
    NotSynced,
    /// Last anchor attempt was confirmed by the ledger.
    Synced,
    /// Last anchor attempt was rejected or timed out.
    SyncFailed,
}

impl SyncStatus {
    /// Stable tag, as persisted in the `sync_status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSynced => "NOT_SYNCED",
            Self::Synced => "SYNCED",
            Self::SyncFailed => "SYNC_FAILED",
        }
    }

    /// Targets reachable from this status through an anchor attempt.
    pub fn valid_transitions(&self) -> &'static [SyncStatus] {
        match self {
            Self::NotSynced => &[Self::Synced, Self::SyncFailed],
            Self::SyncFailed => &[Self::Synced, Self::SyncFailed],
            Self::Synced => &[],
        }
    }

    /// Whether an anchor attempt may move this status to `target`.
    pub fn can_transition_to(&self, target: SyncStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    /// Whether a record in this status is waiting to be anchored.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::NotSynced | Self::SyncFailed)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_SYNCED" => Ok(Self::NotSynced),
            "SYNCED" => Ok(Self::Synced),
            "SYNC_FAILED" => Ok(Self::SyncFailed),
            other => Err(ValidationError::UnknownTag {
                kind: "sync status",
                value: other.to_string(),
            }),
        }
    }
}

// ─── Metadata ────────────────────────────────────────────────────────

/// The mutable administrative fields of a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseMetadata {
    /// License category, free text.
    pub license_type: String,
    /// Issuing authority's license number. Unique across licenses.
    pub license_number: String,
    /// Start of the effective window.
    pub effective_from: Timestamp,
    /// End of the effective window.
    pub effective_until: Timestamp,
    /// Administrative status.
    pub business_status: BusinessStatus,
}

impl LicenseMetadata {
    /// Check field-level constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.license_type.trim().is_empty() {
            return Err(ValidationError::EmptyField("license_type"));
        }
        if self.license_number.trim().is_empty() {
            return Err(ValidationError::EmptyField("license_number"));
        }
        if self.effective_until < self.effective_from {
            return Err(ValidationError::InvertedWindow {
                from: self.effective_from.to_rfc3339(),
                until: self.effective_until.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// The h1 input, in its fixed order:
    /// `[case_id, license_type, license_number, effective_from,
    /// effective_until, business_status]`.
    ///
    /// Reordering these fields invalidates every stored h1.
    pub fn canonical_fields(&self, case_id: &CaseId) -> [String; 6] {
        [
            case_id.to_string(),
            self.license_type.clone(),
            self.license_number.clone(),
            self.effective_from.to_rfc3339(),
            self.effective_until.to_rfc3339(),
            self.business_status.as_str().to_string(),
        ]
    }

    /// Compute h1 for these fields under the given owning case.
    pub fn digest(&self, case_id: &CaseId) -> HexDigest {
        metadata_digest(&self.canonical_fields(case_id))
    }
}

// ─── Record ──────────────────────────────────────────────────────────

/// A license as persisted in the relational store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Immutable identifier; also the ledger key.
    pub id: LicenseId,
    /// Owning case.
    pub case_id: CaseId,
    /// Mutable administrative fields.
    pub metadata: LicenseMetadata,
    /// Location of the stored supporting document, once uploaded.
    pub file_path: Option<String>,
    /// Metadata digest.
    pub h1: Option<HexDigest>,
    /// Document digest.
    pub h2: Option<HexDigest>,
    /// Local anchoring claim.
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LicenseRecord {
    /// A fresh record: h1 computed, no document, `NotSynced`.
    pub fn new(case_id: CaseId, metadata: LicenseMetadata) -> Self {
        let now = Utc::now();
        let h1 = metadata.digest(&case_id);
        Self {
            id: LicenseId::new(),
            case_id,
            metadata,
            file_path: None,
            h1: Some(h1),
            h2: None,
            sync_status: SyncStatus::NotSynced,
            created_at: now,
            updated_at: now,
        }
    }

    /// Both digests, if both are present.
    pub fn hashes(&self) -> Option<(&HexDigest, &HexDigest)> {
        match (&self.h1, &self.h2) {
            (Some(h1), Some(h2)) => Some((h1, h2)),
            _ => None,
        }
    }

    /// Whether this record is waiting to be anchored and can be.
    pub fn is_anchor_pending(&self) -> bool {
        self.sync_status.is_pending() && self.hashes().is_some()
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
