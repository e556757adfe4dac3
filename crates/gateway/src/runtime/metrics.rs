//! Workflow counters.
//!
//! The orchestrator reports through the [`MetricsSink`] it is given instead
//! of touching process-wide state; [`InMemoryMetrics`] is the sink the
//! server installs and exposes on `/health`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Receiver for workflow counters.
pub trait MetricsSink: Send + Sync {
    fn request_received(&self);
    fn session_created(&self);
    fn action_completed(&self);
    fn action_failed(&self);
    fn action_rejected_busy(&self);
}

/// Atomic counters, readable as a [`MetricsSnapshot`].
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    requests: AtomicU64,
    sessions_created: AtomicU64,
    actions_completed: AtomicU64,
    actions_failed: AtomicU64,
    actions_rejected_busy: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub sessions_created: u64,
    pub actions_completed: u64,
    pub actions_failed: u64,
    pub actions_rejected_busy: u64,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            actions_completed: self.actions_completed.load(Ordering::Relaxed),
            actions_failed: self.actions_failed.load(Ordering::Relaxed),
            actions_rejected_busy: self.actions_rejected_busy.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for InMemoryMetrics {
    fn request_received(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    fn action_completed(&self) {
        self.actions_completed.fetch_add(1, Ordering::Relaxed);
    }

    fn action_failed(&self) {
        self.actions_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn action_rejected_busy(&self) {
        self.actions_rejected_busy.fetch_add(1, Ordering::Relaxed);
    }
}
