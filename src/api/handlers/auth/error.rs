//! Error taxonomy for auth flows and its HTTP mapping.
//!
//! Credential and validation errors carry a specific message back to the
//! caller. Anything that comes out of token or identity checks is flattened to
//! a bare `Unauthorized` (or `InvalidRefreshToken` on the refresh endpoint) so
//! responses never reveal which check failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; both produce the same response.
    #[error("Invalid credentials!")]
    InvalidCredentials,
    #[error("User already exists!")]
    UserAlreadyExists,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("User not found")]
    NotFound,
    /// One message per failed field rule.
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::InvalidRefreshToken => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Self::Validation(messages) => json!({
                "statusCode": status.as_u16(),
                "message": messages,
                "error": "Bad Request",
            }),
            Self::Internal(err) => {
                // Details stay in the logs.
                error!("Internal auth error: {err:#}");
                json!({
                    "statusCode": status.as_u16(),
                    "message": "Internal server error",
                })
            }
            other => json!({
                "statusCode": status.as_u16(),
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
