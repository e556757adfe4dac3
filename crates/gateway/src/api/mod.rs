pub mod envelope;
pub mod health;
pub mod logging;
pub mod sessions;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router.
///
/// `state` is needed to wire up the request-logging middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/start", post(sessions::start))
        .route("/api/deploy", post(sessions::deploy))
        // Lookup without an ID is a client error, not a 404.
        .route("/api/session", get(sessions::get_session_missing))
        .route("/api/session/", get(sessions::get_session_missing))
        .route("/api/session/:session_id", get(sessions::get_session))
        .route("/health", get(health::health))
        .layer(middleware::from_fn_with_state(state, logging::log_requests))
}
