//! Session credential configuration.
//!
//! The configuration is a plain value built once at process start by an
//! external loader and passed into [`SessionManager::from_config`]. Nothing in
//! this crate reads the environment or files on its own.
//!
//! [`SessionManager::from_config`]: crate::session::SessionManager::from_config

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum length of the HMAC signing secret, in bytes.
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Session credential configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://auth.example.com"
/// signing_secret = "change-me-to-at-least-32-bytes-of-entropy"
/// access_token_lifetime = "15m"
/// refresh_token_lifetime = "30d"
/// ```
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim in issued access tokens.
    pub issuer: String,

    /// Symmetric key for signing access tokens.
    pub signing_secret: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Absolute lifetime of a refresh token chain, fixed at issuance.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "authgate".to_string(),
            signing_secret: String::new(),
            access_token_lifetime: Duration::from_secs(15 * 60), // 15 minutes
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("signing_secret", &"[REDACTED]")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .finish()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the signing secret is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The issuer is empty
    /// - The signing secret is shorter than [`MIN_SIGNING_SECRET_LEN`] bytes
    /// - Either lifetime is zero
    /// - The refresh lifetime does not exceed the access lifetime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.signing_secret.is_empty() {
            return Err(ConfigError::Missing("auth.signing_secret".to_string()));
        }

        if self.signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "signing_secret must be at least {MIN_SIGNING_SECRET_LEN} bytes, got {}",
                self.signing_secret.len()
            )));
        }

        if self.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be > 0".to_string(),
            ));
        }

        if self.refresh_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "refresh_token_lifetime must be > 0".to_string(),
            ));
        }

        if self.refresh_token_lifetime <= self.access_token_lifetime {
            return Err(ConfigError::InvalidValue(
                "refresh_token_lifetime must be longer than access_token_lifetime".to_string(),
            ));
        }

        Ok(())
    }
}
