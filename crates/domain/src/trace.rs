use serde::Serialize;

/// Structured trace events emitted across all Launchpad crates.
///
/// Session IDs are always the short (8 char) form and secrets never appear
/// here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session: String,
        credential_address: String,
    },
    SessionRead {
        session: String,
        found: bool,
    },
    ActionStarted {
        session: String,
    },
    ActionCompleted {
        session: String,
        action_address: String,
        duration_ms: u64,
    },
    ActionFailed {
        session: String,
        code: String,
        duration_ms: u64,
    },
    ActionRejectedBusy {
        session: String,
    },
    ExecutorRun {
        phase: String,
        exit_code: Option<i32>,
        timed_out: bool,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "lp_event");
    }
}
