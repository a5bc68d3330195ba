//! # lic CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lic_cli::anchoring::{run_anchor, run_ledger_status, run_pending, run_verify, LicenseArgs, PendingArgs};
use lic_cli::hashing::{run_hash_file, run_hash_metadata, HashFileArgs, HashMetadataArgs};

/// License integrity anchoring toolchain.
///
/// Computes h1/h2 digests offline, probes the ledger identity, and anchors
/// or verifies licenses held in the service database.
#[derive(Parser, Debug)]
#[command(name = "lic", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the h2 digest of a document.
    HashFile(HashFileArgs),

    /// Print the h1 digest of license metadata.
    HashMetadata(HashMetadataArgs),

    /// Connect to the ledger and report connected or degraded.
    LedgerStatus,

    /// Push a license's digests to the ledger.
    Anchor(LicenseArgs),

    /// Compare a license's stored digests with the ledger's copy.
    Verify(LicenseArgs),

    /// List licenses waiting to be anchored.
    Pending(PendingArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::HashFile(args) => run_hash_file(&args),
        Commands::HashMetadata(args) => run_hash_metadata(&args),
        Commands::LedgerStatus => run_ledger_status(),
        Commands::Anchor(args) => run_anchor(&args),
        Commands::Verify(args) => run_verify(&args),
        Commands::Pending(args) => run_pending(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_hash_file() {
        let cli = Cli::try_parse_from(["lic", "hash-file", "scan.pdf"]).unwrap();
        if let Commands::HashFile(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("scan.pdf"));
        } else {
            panic!("expected hash-file");
        }
    }

    #[test]
    fn cli_parse_hash_metadata() {
        let cli = Cli::try_parse_from([
            "lic",
            "hash-metadata",
            "--case-id",
            "9a0c7a4e-3d0e-4b63-9d36-1f5b0c7de001",
            "--license-type",
            "food-safety",
            "--license-number",
            "FS-1",
            "--effective-from",
            "2026-01-01T00:00:00Z",
            "--effective-until",
            "2029-01-01T00:00:00Z",
            "--business-status",
            "ACTIVE",
            "--show-fields",
        ])
        .unwrap();
        if let Commands::HashMetadata(args) = cli.command {
            assert_eq!(args.license_number, "FS-1");
            assert!(args.show_fields);
        } else {
            panic!("expected hash-metadata");
        }
    }

    #[test]
    fn cli_hash_metadata_requires_all_fields() {
        assert!(Cli::try_parse_from(["lic", "hash-metadata", "--license-type", "x"]).is_err());
    }

    #[test]
    fn cli_parse_verify_json() {
        let cli = Cli::try_parse_from(["lic", "verify", "abc", "--json"]).unwrap();
        if let Commands::Verify(args) = cli.command {
            assert_eq!(args.id, "abc");
            assert!(args.json);
        } else {
            panic!("expected verify");
        }
    }

    #[test]
    fn cli_parse_anchor_requires_id() {
        assert!(Cli::try_parse_from(["lic", "anchor"]).is_err());
    }

    #[test]
    fn cli_parse_pending_push() {
        let cli = Cli::try_parse_from(["lic", "pending", "--push"]).unwrap();
        assert!(matches!(cli.command, Commands::Pending(PendingArgs { push: true })));
    }

    #[test]
    fn cli_parse_ledger_status_with_verbosity() {
        let cli = Cli::try_parse_from(["lic", "-vv", "ledger-status"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::LedgerStatus));
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["lic", "sign"]).is_err());
    }
}
