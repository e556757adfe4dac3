//! Request logging middleware.
//!
//! Logs method, path and (when one is present) the first eight characters
//! of the session ID for every request, then the status and latency once
//! the handler returns.  Session IDs are read from the path or from a JSON
//! body's `sessionId` field; request bodies are never logged.

use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use lp_domain::session::short_id;

use crate::runtime::metrics::MetricsSink;
use crate::runtime::orchestrator::WorkflowError;
use crate::state::AppState;

/// Largest request body accepted.  Bodies are buffered so the session ID
/// can be logged before the handler runs.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const SESSION_PATH_PREFIX: &str = "/api/session/";

pub async fn log_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.metrics.request_received();
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let (req, session) = if method == Method::POST {
        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%method, %path, error = %e, "request body rejected");
                return WorkflowError::PayloadTooLarge.into_response();
            }
        };
        let session = session_from_body(&bytes);
        (Request::from_parts(parts, Body::from(bytes)), session)
    } else {
        let session = session_from_path(&path);
        (req, session)
    };

    match &session {
        Some(s) => tracing::info!(%method, %path, session = %s, "request"),
        None => tracing::info!(%method, %path, "request"),
    }

    let resp = next.run(req).await;

    tracing::info!(
        %method,
        %path,
        status = resp.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "response"
    );
    resp
}

fn session_from_path(path: &str) -> Option<String> {
    path.strip_prefix(SESSION_PATH_PREFIX)
        .filter(|id| !id.is_empty())
        .map(|id| short_id(id).to_owned())
}

fn session_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("sessionId")
        .and_then(|v| v.as_str())
        .filter(|id| !id.is_empty())
        .map(|id| short_id(id).to_owned())
}
