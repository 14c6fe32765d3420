//! HTTP error responses.
//!
//! Every authentication failure is answered with the same opaque body so
//! that a client cannot tell an unknown token from a replayed one. The
//! precise cause is only logged.

use authgate_auth::AuthError;
use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

const UNAUTHORIZED_BODY: &str = "unauthorized";
const INTERNAL_BODY: &str = "internal server error";

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request is missing or has a malformed parameter.
    #[error("{0}")]
    BadRequest(String),

    /// The `Authorization` header is missing or not a bearer credential.
    #[error("{0}")]
    Unauthorized(String),

    /// The session manager rejected or failed the operation.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

/// Maps a session error to its HTTP status.
pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::MalformedToken { .. }
        | AuthError::InvalidToken { .. }
        | AuthError::Unauthenticated(_)
        | AuthError::TokenReuseDetected { .. } => StatusCode::UNAUTHORIZED,
        AuthError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::IssuanceFailed { .. }
        | AuthError::RevocationFailed { .. }
        | AuthError::Configuration { .. }
        | AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            ApiError::Auth(err) => {
                let status = status_for(err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "Session operation failed");
                    (status, INTERNAL_BODY.to_string())
                } else {
                    if err.is_reuse_detected() {
                        tracing::warn!(error = %err, "Rejected replayed refresh token");
                    } else {
                        tracing::debug!(error = %err, "Rejected credential");
                    }
                    (status, UNAUTHORIZED_BODY.to_string())
                }
            }
        };

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        (status, headers, Json(json!({ "error": message }))).into_response()
    }
}
