//! Unified error type for the Huddle server.
//!
//! Sub-crate errors convert into [`HuddleError`] with `?`. When a handler
//! returns one, the `IntoResponse` impl maps it to an HTTP status and a
//! JSON body. Internal failures are logged server-side and answered with a
//! generic message.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use huddle_room::RoomError;
use huddle_session::SessionError;
use serde::Serialize;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// Maps to HTTP status codes:
/// - Session (invalid token, room mismatch): 401 Unauthorized
/// - Room not found: 404 Not Found
/// - everything else: 500 Internal Server Error
#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HuddleError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Session(SessionError::InvalidToken | SessionError::RoomMismatch { .. }) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Room(RoomError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for HuddleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match status {
            StatusCode::UNAUTHORIZED => ("INVALID_TOKEN", "Invalid or expired token".to_string()),
            StatusCode::NOT_FOUND => ("NOT_FOUND", self.to_string()),
            _ => {
                tracing::error!(error = %self, "request failed");
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail { code, message },
        };
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"huddle\", error=\"invalid_token\""),
            );
        }

        response
    }
}
