//! # lic-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).

use std::time::Duration;

use anyhow::Context;
use lic_api::{AppConfig, AppState};
use lic_ledger::{LedgerBackend, LedgerConfig};
use lic_store::StoreBackend;
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("invalid API configuration")?;
    let ledger_config = LedgerConfig::from_env().context("invalid ledger configuration")?;
    tracing::info!(?config, ?ledger_config, "configuration loaded");

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    let upkeep = prometheus.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(5));
        loop {
            tick.tick().await;
            upkeep.run_upkeep();
        }
    });

    // Absent DATABASE_URL means the in-memory store.
    let pool = lic_store::init_pool()
        .await
        .context("database initialization failed")?;
    let store = StoreBackend::from_pool(pool);

    // Never fails: an unreachable gateway yields a degraded client.
    let ledger = LedgerBackend::connect(ledger_config).await;
    match ledger.degraded_reason() {
        Some(reason) => tracing::warn!(%reason, "ledger client degraded; anchoring will answer 503"),
        None => tracing::info!(backend = ledger.name(), "ledger client connected"),
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("cannot create upload dir {}", config.upload_dir.display()))?;

    let port = config.port;
    tracing::info!(store = store.name(), "license store ready");
    let state = AppState::new(config, store, ledger).with_prometheus(prometheus);
    let app = lic_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("license API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
