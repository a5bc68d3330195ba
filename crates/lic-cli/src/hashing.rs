//! # Digest Commands
//!
//! Offline digest computation with the same hashers the service uses, so an
//! operator can check a stored h1/h2 by hand.
//!
//! ```bash
//! lic hash-file ./scan.pdf
//! lic hash-metadata --case-id 0b6f... --license-type food-safety \
//!     --license-number FS-1 --effective-from 2026-01-01T00:00:00Z \
//!     --effective-until 2029-01-01T00:00:00Z --business-status ACTIVE
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lic_core::{BusinessStatus, CaseId, HexDigest, LicenseMetadata, Timestamp};

#[derive(Args, Debug)]
pub struct HashFileArgs {
    /// Document to hash.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct HashMetadataArgs {
    #[arg(long)]
    pub case_id: String,
    #[arg(long)]
    pub license_type: String,
    #[arg(long)]
    pub license_number: String,
    /// RFC 3339; any offset is normalized to UTC.
    #[arg(long)]
    pub effective_from: String,
    #[arg(long)]
    pub effective_until: String,
    /// ACTIVE, EXPIRING_SOON, EXPIRED, or REVOKED.
    #[arg(long)]
    pub business_status: String,
    /// Print the canonical fields before the digest.
    #[arg(long)]
    pub show_fields: bool,
}

pub fn run_hash_file(args: &HashFileArgs) -> Result<u8> {
    let digest = hash_file(args)?;
    println!("{digest}  {}", args.path.display());
    Ok(0)
}

fn hash_file(args: &HashFileArgs) -> Result<HexDigest> {
    lic_core::file_digest_path(&args.path)
        .with_context(|| format!("cannot hash {}", args.path.display()))
}

pub fn run_hash_metadata(args: &HashMetadataArgs) -> Result<u8> {
    let (case_id, metadata) = parse_metadata(args)?;
    if args.show_fields {
        for (name, value) in CANONICAL_NAMES.iter().zip(metadata.canonical_fields(&case_id)) {
            println!("{name:<16} {value}");
        }
    }
    println!("{}", metadata.digest(&case_id));
    Ok(0)
}

const CANONICAL_NAMES: [&str; 6] = [
    "case_id",
    "license_type",
    "license_number",
    "effective_from",
    "effective_until",
    "business_status",
];

fn parse_metadata(args: &HashMetadataArgs) -> Result<(CaseId, LicenseMetadata)> {
    let case_id: CaseId = args.case_id.parse().context("--case-id")?;
    let metadata = LicenseMetadata {
        license_type: args.license_type.clone(),
        license_number: args.license_number.clone(),
        effective_from: Timestamp::parse(&args.effective_from).context("--effective-from")?,
        effective_until: Timestamp::parse(&args.effective_until).context("--effective-until")?,
        business_status: args
            .business_status
            .parse::<BusinessStatus>()
            .context("--business-status")?,
    };
    metadata.validate()?;
    Ok((case_id, metadata))
}
