//! Session workflow endpoints.
//!
//! - `POST /api/start`              provision a new session
//! - `POST /api/deploy`             run the action for `{ "sessionId" }`
//! - `GET  /api/session/:sessionId` look up a session

use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::envelope::ApiSuccess;
use crate::runtime::orchestrator::{ActionReceipt, SessionView, WorkflowError};
use crate::state::AppState;

/// Deploy request body.  Parsed leniently: any body without a usable
/// `sessionId` is treated as a missing ID rather than a decode error.
#[derive(Debug, Default, Deserialize)]
struct DeployBody {
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
}

impl DeployBody {
    fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/start
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn start(State(state): State<AppState>) -> Result<ApiSuccess<SessionView>, WorkflowError> {
    state.orchestrator.create_session().await.map(ApiSuccess)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/deploy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn deploy(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ApiSuccess<ActionReceipt>, WorkflowError> {
    let session_id = DeployBody::parse(&body).session_id.unwrap_or_default();
    state
        .orchestrator
        .perform_action(&session_id)
        .await
        .map(ApiSuccess)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/session/:sessionId
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_session(
    State(state): State<AppState>,
    session_id: Result<Path<String>, PathRejection>,
) -> Result<ApiSuccess<SessionView>, WorkflowError> {
    // An ID that does not decode cannot name a stored session.
    let Path(session_id) = session_id.map_err(|e| {
        tracing::debug!(error = %e, "undecodable session id");
        WorkflowError::SessionNotFound
    })?;
    state.orchestrator.get_session(&session_id).await.map(ApiSuccess)
}

pub async fn get_session_missing() -> WorkflowError {
    WorkflowError::MissingSessionId
}
