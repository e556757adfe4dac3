use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lp_domain::config::Config;

use crate::runtime::metrics::InMemoryMetrics;
use crate::runtime::orchestrator::Orchestrator;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
    pub metrics: Arc<InMemoryMetrics>,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, orchestrator: Arc<Orchestrator>, metrics: Arc<InMemoryMetrics>) -> Self {
        Self {
            config,
            orchestrator,
            metrics,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}
