//! Session credential error types.
//!
//! This module defines every error the session lifecycle can surface to the
//! transport layer. The variants are deliberately fine-grained for logging and
//! alerting; the transport collapses all authentication failures into a single
//! opaque rejection.

use std::fmt;

use uuid::Uuid;

use crate::token::codec::CodecError;

/// Errors that can occur while issuing, refreshing, validating or revoking
/// session credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The presented refresh token is not a valid encoding of a refresh secret.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of why the token could not be decoded.
        message: String,
    },

    /// The refresh token is unknown, never issued, or expired.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The access token failed verification.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(#[from] CodecError),

    /// An already rotated refresh token was presented again.
    ///
    /// Every session of the owning user has been revoked by the time this
    /// error is returned.
    #[error("Refresh token reuse detected for user {user_id}")]
    TokenReuseDetected {
        /// Owner of the replayed token.
        user_id: Uuid,
    },

    /// The storage backend failed transiently.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the storage failure.
        message: String,
    },

    /// A new token pair could not be issued.
    #[error("Issuance failed: {message}")]
    IssuanceFailed {
        /// Description of the underlying failure.
        message: String,
    },

    /// The user's sessions could not be revoked.
    #[error("Revocation failed: {message}")]
    RevocationFailed {
        /// Description of the underlying failure.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `TokenReuseDetected` error.
    #[must_use]
    pub fn token_reuse_detected(user_id: Uuid) -> Self {
        Self::TokenReuseDetected { user_id }
    }

    /// Creates a new `StorageUnavailable` error.
    #[must_use]
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `IssuanceFailed` error.
    #[must_use]
    pub fn issuance_failed(message: impl Into<String>) -> Self {
        Self::IssuanceFailed {
            message: message.into(),
        }
    }

    /// Creates a new `RevocationFailed` error.
    #[must_use]
    pub fn revocation_failed(message: impl Into<String>) -> Self {
        Self::RevocationFailed {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller presented a bad credential (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken { .. }
                | Self::InvalidToken { .. }
                | Self::Unauthenticated(_)
                | Self::TokenReuseDetected { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. }
                | Self::IssuanceFailed { .. }
                | Self::RevocationFailed { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this error signals replay of a consumed refresh token.
    #[must_use]
    pub fn is_reuse_detected(&self) -> bool {
        matches!(self, Self::TokenReuseDetected { .. })
    }

    /// Returns `true` if the storage backend was unreachable.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedToken { .. } => ErrorCategory::Validation,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::Unauthenticated(_) => ErrorCategory::Token,
            Self::TokenReuseDetected { .. } => ErrorCategory::Replay,
            Self::StorageUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::IssuanceFailed { .. } => ErrorCategory::Infrastructure,
            Self::RevocationFailed { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of session credential errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Input could not be decoded.
    Validation,
    /// Token-related errors (signature, expiration, unknown token).
    Token,
    /// Replay of an already rotated refresh token.
    Replay,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Token => write!(f, "token"),
            Self::Replay => write!(f, "replay"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::malformed_token("not base64url");
        assert_eq!(err.to_string(), "Malformed token: not base64url");

        let err = AuthError::invalid_token("unknown refresh token");
        assert_eq!(err.to_string(), "Invalid token: unknown refresh token");

        let err = AuthError::Unauthenticated(CodecError::Expired);
        assert_eq!(err.to_string(), "Unauthenticated: Token expired");

        let user_id = Uuid::nil();
        let err = AuthError::token_reuse_detected(user_id);
        assert_eq!(
            err.to_string(),
            format!("Refresh token reuse detected for user {user_id}")
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_token("test");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(!err.is_reuse_detected());

        let err = AuthError::token_reuse_detected(Uuid::new_v4());
        assert!(err.is_client_error());
        assert!(err.is_reuse_detected());

        let err = AuthError::storage_unavailable("database down");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
        assert!(err.is_storage_unavailable());

        let err = AuthError::issuance_failed("database down");
        assert!(err.is_server_error());
        assert!(!err.is_storage_unavailable());
    }

    #[test]
    fn test_codec_error_converts_to_unauthenticated() {
        let err: AuthError = CodecError::InvalidSignature.into();
        assert!(matches!(
            err,
            AuthError::Unauthenticated(CodecError::InvalidSignature)
        ));
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::malformed_token("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthError::Unauthenticated(CodecError::Expired).category(),
            ErrorCategory::Token
        );
        assert_eq!(
            AuthError::token_reuse_detected(Uuid::new_v4()).category(),
            ErrorCategory::Replay
        );
        assert_eq!(
            AuthError::revocation_failed("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            AuthError::configuration("x").category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Replay.to_string(), "replay");
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
