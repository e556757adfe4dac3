//! AppState construction extracted from `main.rs`, shared with the
//! integration tests so they boot exactly what `serve` boots.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use lp_domain::config::{Config, ConfigSeverity, StoreBackend};
use lp_executor::{Executor, ScriptExecutor};
use lp_sessions::{FileSessionStore, MemorySessionStore, SessionStore};

use crate::runtime::metrics::InMemoryMetrics;
use crate::runtime::orchestrator::Orchestrator;
use crate::state::AppState;

/// Validate config, open the session store, build the script executor and
/// return a fully-wired [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Session store ────────────────────────────────────────────────
    let store: Arc<dyn SessionStore> = match config.store.backend {
        StoreBackend::File => Arc::new(
            FileSessionStore::open(config.store.path.clone())
                .await
                .with_context(|| format!("opening session store {}", config.store.path.display()))?,
        ),
        StoreBackend::Memory => Arc::new(MemorySessionStore::new()),
    };
    tracing::info!(store = %store.describe(), "session store ready");

    // ── Executor ─────────────────────────────────────────────────────
    let executor: Arc<dyn Executor> = Arc::new(ScriptExecutor::new(config.executor.clone()));
    tracing::info!(
        workdir = %config.executor.workdir.display(),
        provision = %config.executor.provision_command,
        action = %config.executor.action_command,
        timeout_sec = config.executor.timeout_sec,
        "script executor ready"
    );

    Ok(assemble(config, store, executor))
}

/// Wire an [`AppState`] from already-built parts.
pub fn assemble(
    config: Arc<Config>,
    store: Arc<dyn SessionStore>,
    executor: Arc<dyn Executor>,
) -> AppState {
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        executor,
        metrics.clone(),
        Duration::from_secs(config.executor.timeout_sec),
    ));
    AppState::new(config, orchestrator, metrics)
}
