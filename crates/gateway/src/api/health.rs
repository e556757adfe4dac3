//! `GET /health`: liveness plus workflow counters.  Not enveloped.

use axum::extract::{Json, State};
use serde::Serialize;

use crate::runtime::metrics::MetricsSnapshot;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    started_at: String,
    uptime_sec: u64,
    store: String,
    active_actions: usize,
    stats: MetricsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<impl Serialize> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at.to_rfc3339(),
        uptime_sec: state.uptime().as_secs(),
        store: state.orchestrator.store().describe(),
        active_actions: state.orchestrator.tracked_locks(),
        stats: state.metrics.snapshot(),
    })
}
