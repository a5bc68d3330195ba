//! # lic-api: HTTP Surface for License Anchoring
//!
//! Axum router over [`lic_anchor`]: license CRUD, document upload, anchor
//! and verification endpoints, health probes, and Prometheus metrics.
//!
//! ## API Surface
//!
//! | Route | Handler module |
//! |-------|----------------|
//! | `POST/GET /v1/licenses` | [`routes::licenses`] |
//! | `GET/PUT/DELETE /v1/licenses/{id}` | [`routes::licenses`] |
//! | `GET/PUT /v1/licenses/{id}/document` | [`routes::licenses`] |
//! | `POST /v1/licenses/{id}/anchor` | [`routes::anchoring`] |
//! | `GET /v1/licenses/{id}/verification` | [`routes::anchoring`] |
//! | `GET /v1/licenses/pending` | [`routes::anchoring`] |
//! | `GET /v1/ledger/status` | [`routes::anchoring`] |
//! | `GET /openapi.json` | [`openapi`] |
//! | `GET /health/liveness`, `/health/readiness`, `/metrics` | this module |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to `lic-anchor`.
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use lic_ledger::LedgerClient;
use lic_store::StoreBackend;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router.
///
/// Health probes and `/metrics` sit outside the metrics middleware so
/// scrapes do not count themselves.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::licenses::router())
        .merge(routes::anchoring::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let unmetered = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(unmetered).merge(api)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Fails when the PostgreSQL store is configured but unreachable. A
/// degraded ledger does not fail readiness: CRUD keeps working and anchor
/// calls answer 503 on their own. The second line carries the request
/// totals seen by the metrics middleware.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let totals = format!(
        "requests={} errors={}",
        state.metrics.requests(),
        state.metrics.errors()
    );
    if let StoreBackend::Postgres(pg) = state.store() {
        if let Err(e) = sqlx::query("SELECT 1").execute(pg.pool()).await {
            tracing::warn!(error = %e, "database health check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable".to_string());
        }
    }

    let ledger = state.ledger();
    if ledger.is_degraded() {
        let reason = ledger.degraded_reason().unwrap_or_default();
        return (
            StatusCode::OK,
            format!("ready (ledger degraded: {reason})\n{totals}"),
        );
    }
    (StatusCode::OK, format!("ready\n{totals}"))
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
