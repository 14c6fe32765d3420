//! Refresh token record.
//!
//! A refresh token is a 256-bit random secret handed to the client as
//! base64url text. Only its SHA-256 digest is persisted, together with the
//! audit context of the request that obtained it.
//!
//! # Rotation chain
//!
//! Each successful refresh revokes the presented record and creates a child
//! pointing back at it through `parent_id`. The child keeps the parent's
//! `expires_at`, so a chain has one absolute lifetime fixed at issuance.
//! `revoked` only ever goes from `false` to `true`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthError;

/// Length of a decoded refresh secret, in bytes.
pub const REFRESH_SECRET_LEN: usize = 32;

/// Persisted state of one refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Owner of the session.
    pub user_id: Uuid,

    /// SHA-256 hex digest of the secret. The secret itself is never stored.
    pub token_hash: String,

    /// `User-Agent` of the request that obtained this token.
    pub user_agent: String,

    /// Client IP of the request that obtained this token.
    pub ip: String,

    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Record this one was rotated from (`None` for the head of a chain).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,

    pub revoked: bool,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshTokenRecord {
    /// Creates the head record of a new rotation chain.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        token_hash: String,
        user_agent: impl Into<String>,
        ip: impl Into<String>,
        issued_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            user_agent: user_agent.into(),
            ip: ip.into(),
            issued_at,
            expires_at,
            parent_id: None,
            revoked: false,
            revoked_at: None,
        }
    }

    /// Creates the successor of this record in its rotation chain.
    ///
    /// The child carries fresh request context and a new secret digest but
    /// keeps the chain's original expiry.
    #[must_use]
    pub fn rotate(
        &self,
        token_hash: String,
        user_agent: impl Into<String>,
        ip: impl Into<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            token_hash,
            user_agent: user_agent.into(),
            ip: ip.into(),
            issued_at: now,
            expires_at: self.expires_at,
            parent_id: Some(self.id),
            revoked: false,
            revoked_at: None,
        }
    }

    /// Returns `true` if the record is at or past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if the record can still be exchanged at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }

    /// Returns `true` if the presenting request differs from the one that
    /// obtained this token.
    #[must_use]
    pub fn context_differs(&self, user_agent: &str, ip: &str) -> bool {
        self.user_agent != user_agent || self.ip != ip
    }

    /// Hash a refresh secret using SHA-256.
    ///
    /// Used both when storing new records and when looking up presented
    /// tokens.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a fresh refresh secret from the OS random source.
    ///
    /// Returns 256 random bits encoded as base64url without padding
    /// (43 characters).
    #[must_use]
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; REFRESH_SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Checks that `token` is a well-formed refresh secret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if `token` is not base64url
    /// without padding or does not decode to exactly
    /// [`REFRESH_SECRET_LEN`] bytes.
    pub fn decode_secret(token: &str) -> Result<[u8; REFRESH_SECRET_LEN], AuthError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| AuthError::malformed_token(format!("not base64url: {e}")))?;

        <[u8; REFRESH_SECRET_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            AuthError::malformed_token(format!(
                "expected {REFRESH_SECRET_LEN} bytes, got {}",
                bytes.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn record(expires_at: OffsetDateTime) -> RefreshTokenRecord {
        RefreshTokenRecord::new(
            Uuid::new_v4(),
            RefreshTokenRecord::hash_token("test-token"),
            "curl/8.0",
            "10.0.0.1",
            OffsetDateTime::now_utc(),
            expires_at,
        )
    }

    #[test]
    fn test_hash_token() {
        let hash = RefreshTokenRecord::hash_token("test-token-value");

        // SHA-256 produces 64 hex characters
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, RefreshTokenRecord::hash_token("test-token-value"));
        assert_ne!(hash, RefreshTokenRecord::hash_token("different-token"));
    }

    #[test]
    fn test_generate_secret_shape() {
        let secret = RefreshTokenRecord::generate_secret();

        assert_eq!(secret.len(), 43);
        assert!(
            secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert!(RefreshTokenRecord::decode_secret(&secret).is_ok());
    }

    #[test]
    fn test_generate_secret_uniqueness() {
        let mut secrets: Vec<String> = (0..100)
            .map(|_| RefreshTokenRecord::generate_secret())
            .collect();
        secrets.sort();
        secrets.dedup();
        assert_eq!(secrets.len(), 100);
    }

    #[test]
    fn test_decode_secret_rejects_bad_input() {
        for bad in [
            "",
            "not base64!",
            // padded form of a 32-byte value
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=",
            // 16 bytes
            "AAAAAAAAAAAAAAAAAAAAAA",
            // 33 bytes
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        ] {
            let err = RefreshTokenRecord::decode_secret(bad).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedToken { .. }),
                "expected malformed for {bad:?}"
            );
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
        let token = record(expires_at);

        assert!(!token.is_expired_at(expires_at - Duration::seconds(1)));
        assert!(token.is_expired_at(expires_at));
        assert!(token.is_active_at(expires_at - Duration::seconds(1)));
        assert!(!token.is_active_at(expires_at));
    }

    #[test]
    fn test_revoked_is_not_active() {
        let mut token = record(OffsetDateTime::now_utc() + Duration::hours(1));
        token.revoked = true;
        assert!(!token.is_active_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn test_rotate_continues_chain() {
        let parent = record(OffsetDateTime::now_utc() + Duration::days(30));
        let now = OffsetDateTime::now_utc();
        let child = parent.rotate(
            RefreshTokenRecord::hash_token("next"),
            "Mozilla/5.0",
            "10.0.0.2",
            now,
        );

        assert_ne!(child.id, parent.id);
        assert_eq!(child.user_id, parent.user_id);
        assert_eq!(child.parent_id, Some(parent.id));
        assert_eq!(child.expires_at, parent.expires_at);
        assert_eq!(child.issued_at, now);
        assert_eq!(child.user_agent, "Mozilla/5.0");
        assert_eq!(child.ip, "10.0.0.2");
        assert!(!child.revoked);
        assert!(child.revoked_at.is_none());
    }

    #[test]
    fn test_context_differs() {
        let token = record(OffsetDateTime::now_utc() + Duration::hours(1));
        assert!(!token.context_differs("curl/8.0", "10.0.0.1"));
        assert!(token.context_differs("curl/8.0", "10.0.0.9"));
        assert!(token.context_differs("wget", "10.0.0.1"));
    }

    #[test]
    fn test_serialization() {
        let token = record(OffsetDateTime::now_utc() + Duration::hours(1));

        let json = serde_json::to_value(&token).unwrap();
        assert!(json.get("tokenHash").is_some());
        assert!(json.get("parentId").is_none());

        let back: RefreshTokenRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, token.id);
        assert_eq!(back.token_hash, token.token_hash);
    }
}
