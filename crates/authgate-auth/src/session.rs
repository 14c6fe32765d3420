//! Session lifecycle manager.
//!
//! Issues token pairs, rotates refresh tokens, validates access tokens and
//! revokes sessions. The manager holds no mutable state of its own; all
//! coordination between concurrent callers happens in the storage backend
//! through [`RefreshTokenStorage::rotate`].
//!
//! # Replay detection
//!
//! A refresh token is single use. Presenting one that is already revoked, or
//! losing the race to revoke it, is treated as theft: every session of the
//! owner is revoked, a [`TokenReuseEvent`] is dispatched to the alerter in
//! the background and the caller gets [`AuthError::TokenReuseDetected`].
//!
//! # Usage
//!
//! ```ignore
//! use authgate_auth::session::SessionManager;
//!
//! let manager = SessionManager::from_config(&config, storage, alerter)?;
//! let pair = manager.generate_token_pair(user_id, "curl/8.0", "10.0.0.1").await?;
//! let next = manager.refresh_tokens(&pair.refresh_token, "curl/8.0", "10.0.0.1").await?;
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{Instrument, instrument};
use uuid::Uuid;

use crate::alert::{SecurityAlerter, TokenReuseEvent};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::RefreshTokenStorage;
use crate::token::codec::AccessTokenCodec;
use crate::types::{RefreshTokenRecord, TokenPair};
use crate::AuthResult;

/// Orchestrates the credential lifecycle over a codec, a storage backend and
/// an alerter.
pub struct SessionManager {
    codec: Arc<AccessTokenCodec>,
    storage: Arc<dyn RefreshTokenStorage>,
    alerter: Arc<dyn SecurityAlerter>,
    refresh_token_lifetime: Duration,
}

impl SessionManager {
    /// Creates a manager from already constructed parts.
    #[must_use]
    pub fn new(
        codec: Arc<AccessTokenCodec>,
        storage: Arc<dyn RefreshTokenStorage>,
        alerter: Arc<dyn SecurityAlerter>,
        refresh_token_lifetime: Duration,
    ) -> Self {
        Self {
            codec,
            storage,
            alerter,
            refresh_token_lifetime,
        }
    }

    /// Validates `config` and builds the codec and manager from it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid.
    pub fn from_config(
        config: &AuthConfig,
        storage: Arc<dyn RefreshTokenStorage>,
        alerter: Arc<dyn SecurityAlerter>,
    ) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let access_lifetime = Duration::try_from(config.access_token_lifetime)
            .map_err(|e| AuthError::configuration(format!("access_token_lifetime: {e}")))?;
        let refresh_lifetime = Duration::try_from(config.refresh_token_lifetime)
            .map_err(|e| AuthError::configuration(format!("refresh_token_lifetime: {e}")))?;

        let codec = AccessTokenCodec::new(
            config.signing_secret.as_bytes(),
            config.issuer.clone(),
            access_lifetime,
        )
        .map_err(|e| AuthError::configuration(e.to_string()))?;

        Ok(Self::new(
            Arc::new(codec),
            storage,
            alerter,
            refresh_lifetime,
        ))
    }

    /// Issues a new token pair, starting a fresh rotation chain.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IssuanceFailed` if the access token cannot be
    /// signed or the refresh record cannot be stored. Nothing is returned to
    /// the caller in that case.
    #[instrument(skip(self, user_agent, ip), fields(user_id = %user_id))]
    pub async fn generate_token_pair(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip: &str,
    ) -> AuthResult<TokenPair> {
        let now = OffsetDateTime::now_utc();

        let access_token = self
            .codec
            .issue_at(user_id, now)
            .map_err(|e| AuthError::issuance_failed(e.to_string()))?;

        let secret = RefreshTokenRecord::generate_secret();
        let record = RefreshTokenRecord::new(
            user_id,
            RefreshTokenRecord::hash_token(&secret),
            user_agent,
            ip,
            now,
            now + self.refresh_token_lifetime,
        );

        self.storage.create(&record).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to store refresh token");
            AuthError::issuance_failed(e.to_string())
        })?;

        tracing::debug!(token_id = %record.id, "Issued token pair");
        Ok(self.token_pair(access_token, secret))
    }

    /// Exchanges a refresh token for a new pair, revoking the presented one.
    ///
    /// Revoking the presented record and storing its successor is a single
    /// storage step, so a concurrent mass revocation of the owner either
    /// makes this call fail as reuse or also revokes the successor.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` if the value is not a refresh secret encoding
    /// - `InvalidToken` if it was never issued or its chain has expired
    /// - `TokenReuseDetected` if it was already consumed or a concurrent
    ///   caller consumed it first
    /// - `StorageUnavailable` on backend failure
    #[instrument(skip_all)]
    pub async fn refresh_tokens(
        &self,
        refresh_token: &str,
        user_agent: &str,
        ip: &str,
    ) -> AuthResult<TokenPair> {
        RefreshTokenRecord::decode_secret(refresh_token)?;

        let token_hash = RefreshTokenRecord::hash_token(refresh_token);
        let record = self
            .storage
            .find_by_hash(&token_hash)
            .await?
            .ok_or_else(|| AuthError::invalid_token("unknown refresh token"))?;

        if record.revoked {
            return Err(self.handle_reuse(&record, user_agent, ip).await);
        }

        let now = OffsetDateTime::now_utc();
        if record.is_expired_at(now) {
            return Err(AuthError::invalid_token("refresh token expired"));
        }

        if record.context_differs(user_agent, ip) {
            tracing::info!(
                user_id = %record.user_id,
                token_id = %record.id,
                previous_ip = %record.ip,
                ip = %ip,
                previous_user_agent = %record.user_agent,
                user_agent = %user_agent,
                "Refresh token presented from a different client context"
            );
        }

        let access_token = self
            .codec
            .issue_at(record.user_id, now)
            .map_err(|e| AuthError::issuance_failed(e.to_string()))?;

        let secret = RefreshTokenRecord::generate_secret();
        let child = record.rotate(
            RefreshTokenRecord::hash_token(&secret),
            user_agent,
            ip,
            now,
        );

        let rotated = self.storage.rotate(record.id, &child).await.map_err(|e| {
            tracing::warn!(
                user_id = %record.user_id,
                token_id = %record.id,
                error = %e,
                "Failed to rotate refresh token"
            );
            e
        })?;
        if !rotated {
            return Err(self.handle_reuse(&record, user_agent, ip).await);
        }

        tracing::debug!(
            user_id = %record.user_id,
            token_id = %child.id,
            parent_id = %record.id,
            "Rotated refresh token"
        );
        Ok(self.token_pair(access_token, secret))
    }

    /// Verifies an access token and returns its user ID. No storage access.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` carrying the codec failure.
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Uuid> {
        self.codec.verify(token).map_err(AuthError::from)
    }

    /// Revokes every active session of a user. Succeeds when there is none.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RevocationFailed` on storage failure.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn revoke_tokens(&self, user_id: Uuid) -> AuthResult<u64> {
        let count = self
            .storage
            .revoke_all_for_user(user_id)
            .await
            .map_err(|e| AuthError::revocation_failed(e.to_string()))?;

        tracing::info!(count, "Revoked user sessions");
        Ok(count)
    }

    /// Lists a user's active sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::StorageUnavailable` on storage failure.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_sessions(&self, user_id: Uuid) -> AuthResult<Vec<RefreshTokenRecord>> {
        self.storage.list_active_for_user(user_id).await
    }

    /// Returns the access token codec.
    #[must_use]
    pub fn codec(&self) -> &Arc<AccessTokenCodec> {
        &self.codec
    }

    fn token_pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        let expires_in = u64::try_from(self.codec.lifetime().whole_seconds()).unwrap_or(0);
        TokenPair::new(access_token, refresh_token, expires_in)
    }

    /// Revokes the owner's sessions, dispatches the alert and builds the
    /// error returned to the caller. Never downgrades to another error.
    async fn handle_reuse(
        &self,
        record: &RefreshTokenRecord,
        user_agent: &str,
        ip: &str,
    ) -> AuthError {
        tracing::warn!(
            user_id = %record.user_id,
            token_id = %record.id,
            ip = %ip,
            "Refresh token reuse detected, revoking all sessions"
        );

        match self.storage.revoke_all_for_user(record.user_id).await {
            Ok(count) => tracing::warn!(
                user_id = %record.user_id,
                count,
                "Revoked sessions after token reuse"
            ),
            Err(e) => tracing::error!(
                user_id = %record.user_id,
                error = %e,
                "Failed to revoke sessions after token reuse"
            ),
        }

        let event = TokenReuseEvent {
            user_id: record.user_id,
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            detected_at: OffsetDateTime::now_utc(),
            token_id: record.id,
        };
        let alerter = self.alerter.clone();
        tokio::spawn(
            async move {
                if let Err(e) = alerter.notify(&event).await {
                    tracing::warn!(error = %e, "Failed to deliver token reuse alert");
                }
            }
            .in_current_span(),
        );

        AuthError::token_reuse_detected(record.user_id)
    }
}
