//! Response envelope shared by every `/api` endpoint.
//!
//! Success: `{ "success": true, "data": <payload> }` with 200.
//! Failure: `{ "success": false, "error": { "code", "message" } }` with a
//! status derived from the error's class.

use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::runtime::orchestrator::{ErrorClass, WorkflowError};

/// 200 response wrapping `data` in the success envelope.
pub struct ApiSuccess<T>(pub T);

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        Json(serde_json::json!({ "success": true, "data": self.0 })).into_response()
    }
}

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Input => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorClass::Storage | ErrorClass::Executor | ErrorClass::OutputParse => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = status_for(self.class());
        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed");
        } else {
            tracing::debug!(code = self.code(), status = status.as_u16(), "request rejected");
        }
        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": { "code": self.code(), "message": self.to_string() },
            })),
        )
            .into_response()
    }
}
