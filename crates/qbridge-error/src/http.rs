use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{AclError, BridgeError};

/// Plain-text error body. The wire surface in section 4.7/7 of the design is
/// text/plain on error (clients are pulling query results, not a JSON API),
/// so unlike a typical REST error envelope this is rendered as `error_code:
/// message` rather than JSON.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error_code: error_code.into(), message: message.into() }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        // 204 carries no body: another consumer is already draining this qid.
        if let Self::Conflict { .. } = &self {
            return StatusCode::NO_CONTENT.into_response();
        }
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => unreachable!(),
            Self::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse::new(self.code(), self.to_string());
        (status, body.to_string()).into_response()
    }
}

impl IntoResponse for AclError {
    fn into_response(self) -> Response {
        BridgeError::Unauthorized(self).into_response()
    }
}
