//! # Ledger Commands
//!
//! Run the coordinator and verifier from the command line against the
//! service's store (`DATABASE_URL`) and ledger (`LEDGER_*`). Useful for
//! re-driving `SYNC_FAILED` records and for spot checks after an incident.

use anyhow::{bail, Context, Result};
use clap::Args;
use lic_anchor::{AnchorCoordinator, LicenseRegistry, Verifier};
use lic_core::LicenseId;
use lic_ledger::{LedgerBackend, LedgerConfig};
use lic_store::StoreBackend;

use crate::{EXIT_DEGRADED, EXIT_DRIFT};

#[derive(Args, Debug)]
pub struct LicenseArgs {
    /// License id (UUID).
    pub id: String,
    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PendingArgs {
    /// Push every pending license instead of listing them.
    #[arg(long)]
    pub push: bool,
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")
}

async fn connect_store() -> Result<StoreBackend> {
    match lic_store::init_pool().await.context("database initialization failed")? {
        Some(pool) => Ok(StoreBackend::from_pool(Some(pool))),
        None => bail!("DATABASE_URL must point at the license database"),
    }
}

async fn connect_ledger() -> Result<LedgerBackend> {
    let config = LedgerConfig::from_env().context("invalid ledger configuration")?;
    Ok(LedgerBackend::connect(config).await)
}

fn parse_id(raw: &str) -> Result<LicenseId> {
    raw.parse::<LicenseId>()
        .with_context(|| format!("{raw:?} is not a license id"))
}

/// `lic ledger-status`
pub fn run_ledger_status() -> Result<u8> {
    runtime()?.block_on(async {
        let config = LedgerConfig::from_env().context("invalid ledger configuration")?;
        println!("mode        {:?}", config.mode);
        if let Some(url) = &config.gateway_url {
            println!("gateway     {url}");
        }
        println!("channel     {}", config.channel);
        println!("chaincode   {}", config.chaincode);
        println!("identity    {} ({})", config.identity_label, config.msp_id);
        println!("wallet      {}", config.wallet_path.display());

        let ledger = LedgerBackend::connect(config).await;
        match ledger.degraded_reason() {
            Some(reason) => {
                println!("status      DEGRADED: {reason}");
                Ok(EXIT_DEGRADED)
            }
            None => {
                println!("status      connected ({})", ledger.name());
                Ok(0)
            }
        }
    })
}

/// `lic anchor <id>`
pub fn run_anchor(args: &LicenseArgs) -> Result<u8> {
    let id = parse_id(&args.id)?;
    runtime()?.block_on(async {
        let coordinator = AnchorCoordinator::new(connect_store().await?, connect_ledger().await?);
        let receipt = coordinator.push_to_ledger(id).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        } else {
            println!("anchored {id}");
            println!("  h1 {}", receipt.h1);
            println!("  h2 {}", receipt.h2);
        }
        Ok(0)
    })
}

/// `lic verify <id>`
pub fn run_verify(args: &LicenseArgs) -> Result<u8> {
    let id = parse_id(&args.id)?;
    runtime()?.block_on(async {
        let verifier = Verifier::new(connect_store().await?, connect_ledger().await?);
        let report = verifier.verify_license(id).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("license {id} ({})", report.sync_status);
            println!("  h1 {}", verdict(report.h1_matches));
            println!("  h2 {}", verdict(report.h2_matches));
            println!("  {}", report.message);
        }
        Ok(if report.is_consistent() { 0 } else { EXIT_DRIFT })
    })
}

fn verdict(matches: bool) -> &'static str {
    if matches {
        "match"
    } else {
        "MISMATCH"
    }
}

/// `lic pending [--push]`
pub fn run_pending(args: &PendingArgs) -> Result<u8> {
    runtime()?.block_on(async {
        let store = connect_store().await?;
        let pending = LicenseRegistry::new(store.clone()).pending_anchors().await?;
        if !args.push {
            for record in &pending {
                println!("{}  {:<11}  {}", record.id, record.sync_status.as_str(), record.metadata.license_number);
            }
            println!("{} pending", pending.len());
            return Ok(0);
        }

        let ledger = connect_ledger().await?;
        if let Some(reason) = ledger.degraded_reason() {
            bail!("ledger degraded, nothing pushed: {reason}");
        }
        let coordinator = AnchorCoordinator::new(store, ledger);
        let mut failed = 0usize;
        for record in &pending {
            match coordinator.push_to_ledger(record.id).await {
                Ok(_) => println!("{}  anchored", record.id),
                Err(e) => {
                    failed += 1;
                    println!("{}  FAILED: {e}", record.id);
                }
            }
        }
        println!("{} anchored, {failed} failed", pending.len() - failed);
        Ok(if failed == 0 { 0 } else { 1 })
    })
}
