//! The external executor behind Launchpad's two workflow phases.
//!
//! [`Executor`] is the seam the orchestrator calls through: `provision`
//! mints credential material for a new session, `act` performs the
//! session's external action with that material.  [`ScriptExecutor`] is the
//! production implementation and drives shell scripts.
//!
//! A failing executor and an executor that "succeeds" with unreadable
//! output are different faults and are reported as different
//! [`ExecutorError`] variants.

pub mod output;
pub mod script;

use std::fmt;

use async_trait::async_trait;

use lp_domain::{ActionOutcome, Provisioned};

pub use script::ScriptExecutor;

/// Which workflow phase an executor call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Provision,
    Action,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Provision => "provision",
            Self::Action => "action",
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The step itself failed: non-zero exit, spawn failure, timeout.
    #[error("{phase} failed: {detail}")]
    Failed { phase: Phase, detail: String },

    /// The step exited cleanly but its output could not be decoded.
    #[error("{phase} output could not be parsed: {detail}")]
    OutputParse { phase: Phase, detail: String },
}

impl ExecutorError {
    pub fn failed(phase: Phase, detail: impl Into<String>) -> Self {
        Self::Failed {
            phase,
            detail: detail.into(),
        }
    }

    pub fn output_parse(phase: Phase, detail: impl Into<String>) -> Self {
        Self::OutputParse {
            phase,
            detail: detail.into(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Failed { phase, .. } | Self::OutputParse { phase, .. } => *phase,
        }
    }
}

/// Provisioning and action work done on the orchestrator's behalf.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Produce credential material for a new session.
    async fn provision(&self) -> Result<Provisioned, ExecutorError>;

    /// Perform the session's action using its secret.
    async fn act(&self, secret: &str) -> Result<ActionOutcome, ExecutorError>;
}
