//! # authgate-auth
//!
//! Session credential lifecycle for the authgate server.
//!
//! This crate provides:
//! - Signed, short-lived access tokens verified without storage access
//! - Single-use refresh tokens stored only as SHA-256 digests
//! - Refresh token rotation with replay detection
//! - Mass revocation of a user's sessions on logout or detected theft
//! - A storage contract with an in-memory backend
//!
//! ## Overview
//!
//! Each issuance starts a rotation chain. Every refresh revokes the presented
//! record and appends a child to the chain, so only the newest refresh token
//! of a chain is ever valid. Presenting a revoked one is treated as theft:
//! all of the owner's sessions are revoked and a security alert is sent.
//!
//! ## Modules
//!
//! - [`config`] - Token lifetimes, issuer and signing secret
//! - [`token`] - Access token codec
//! - [`types`] - Refresh token records and token pairs
//! - [`storage`] - Storage trait and in-memory backend
//! - [`alert`] - Security alerting contract
//! - [`session`] - Session lifecycle manager

pub mod alert;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use alert::{AlertError, NoopAlerter, SecurityAlerter, TokenReuseEvent};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use session::SessionManager;
pub use storage::{MemoryRefreshTokenStorage, RefreshTokenStorage};
pub use token::{AccessTokenCodec, CodecError};
pub use types::{RefreshTokenRecord, TokenPair};

/// Type alias for session credential results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use authgate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::alert::{AlertError, NoopAlerter, SecurityAlerter, TokenReuseEvent};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::session::SessionManager;
    pub use crate::storage::{MemoryRefreshTokenStorage, RefreshTokenStorage};
    pub use crate::token::{AccessTokenCodec, CodecError};
    pub use crate::types::{RefreshTokenRecord, TokenPair};
}
