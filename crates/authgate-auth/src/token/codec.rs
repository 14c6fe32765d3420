//! Access token codec.
//!
//! Access tokens are HS256-signed JWTs carrying the user ID as `sub` plus a
//! short expiry. Verification is pure: no storage lookup is involved, so a
//! token stays valid until it expires even if the user's refresh tokens are
//! revoked in the meantime.
//!
//! ## Example
//!
//! ```ignore
//! use authgate_auth::token::codec::AccessTokenCodec;
//!
//! let codec = AccessTokenCodec::new(secret.as_bytes(), "authgate", Duration::minutes(15))?;
//! let token = codec.issue(user_id)?;
//! assert_eq!(codec.verify(&token)?, user_id);
//! ```

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while issuing or verifying access tokens.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The token structure could not be parsed.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// The token signature does not match the configured key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token is at or past its expiry.
    #[error("Token expired")]
    Expired,

    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },
}

impl CodecError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a verification failure (as opposed to an
    /// encoding failure on our side).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::InvalidSignature | Self::Expired
        )
    }
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            // A foreign issuer or algorithm means we did not sign it.
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Subject (user ID).
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// JWT ID.
    pub jti: String,
}

// ============================================================================
// Codec
// ============================================================================

/// Issues and verifies signed access tokens.
///
/// This type is `Send + Sync` and holds no mutable state; share it behind an
/// `Arc`.
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl AccessTokenCodec {
    /// Creates a codec from a symmetric signing secret.
    ///
    /// # Errors
    /// Returns an error if the secret is empty or the lifetime is not positive.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        lifetime: Duration,
    ) -> Result<Self, CodecError> {
        if secret.is_empty() {
            return Err(CodecError::encoding("signing secret must not be empty"));
        }
        if !lifetime.is_positive() {
            return Err(CodecError::encoding(
                "access token lifetime must be positive",
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            lifetime,
        })
    }

    /// Issues an access token for `user_id` expiring one lifetime from now.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue(&self, user_id: Uuid) -> Result<String, CodecError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    /// Issues an access token as if the current time were `now`.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> Result<String, CodecError> {
        let iat = now.unix_timestamp();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            iat,
            exp: iat + self.lifetime.whole_seconds(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CodecError::encoding(e.to_string()))
    }

    /// Verifies a token against the wall clock and returns its user ID.
    ///
    /// # Errors
    /// Returns `InvalidSignature`, `Expired` or `Malformed`.
    pub fn verify(&self, token: &str) -> Result<Uuid, CodecError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Verifies a token as if the current time were `now`.
    ///
    /// A token is expired from the second named by its `exp` claim onwards.
    ///
    /// # Errors
    /// Returns `InvalidSignature`, `Expired` or `Malformed`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Uuid, CodecError> {
        let claims = self.decode(token)?;

        if now.unix_timestamp() >= claims.exp {
            return Err(CodecError::Expired);
        }

        Uuid::parse_str(&claims.sub)
            .map_err(|e| CodecError::malformed(format!("subject is not a user id: {e}")))
    }

    /// Returns the configured access token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Returns the issuer claim value.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    fn decode(&self, token: &str) -> Result<AccessTokenClaims, CodecError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        // Expiry is checked in verify_at against an explicit instant.
        validation.validate_exp = false;
        validation.validate_aud = false;

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(CodecError::from)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const ISSUER: &str = "https://auth.example.com";

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::new(SECRET, ISSUER, Duration::minutes(15)).unwrap()
    }

    fn fixed_now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let token = codec.issue(user_id).unwrap();
        assert!(!token.is_empty());
        assert_eq!(codec.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let now = fixed_now();

        let token = codec.issue_at(user_id, now).unwrap();

        let one_tick_before = now + Duration::minutes(15) - Duration::seconds(1);
        assert_eq!(codec.verify_at(&token, one_tick_before).unwrap(), user_id);

        let at_expiry = now + Duration::minutes(15);
        assert!(matches!(
            codec.verify_at(&token, at_expiry),
            Err(CodecError::Expired)
        ));

        let after_expiry = at_expiry + Duration::hours(1);
        assert!(matches!(
            codec.verify_at(&token, after_expiry),
            Err(CodecError::Expired)
        ));
    }

    #[test]
    fn test_wall_clock_expired_token_rejected() {
        let codec = codec();
        let issued = OffsetDateTime::now_utc() - Duration::hours(1);
        let token = codec.issue_at(Uuid::new_v4(), issued).unwrap();

        assert!(matches!(codec.verify(&token), Err(CodecError::Expired)));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let codec1 = codec();
        let codec2 = AccessTokenCodec::new(
            b"ffffffffffffffffffffffffffffffff",
            ISSUER,
            Duration::minutes(15),
        )
        .unwrap();

        let token = codec1.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(
            codec2.verify(&token),
            Err(CodecError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();
        let token = codec.issue(Uuid::new_v4()).unwrap();

        let other = codec.issue(Uuid::new_v4()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(
            codec.verify(&forged),
            Err(CodecError::InvalidSignature)
        ));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let ours = codec();
        let theirs =
            AccessTokenCodec::new(SECRET, "https://evil.example.com", Duration::minutes(15))
                .unwrap();

        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(
            ours.verify(&token),
            Err(CodecError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let codec = codec();

        for garbage in ["", "not-a-jwt", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.e30"] {
            let result = codec.verify(garbage);
            assert!(
                matches!(result, Err(CodecError::Malformed { .. })),
                "expected malformed for {garbage:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_non_uuid_subject_is_malformed() {
        let codec = codec();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessTokenClaims {
            sub: "alice".to_string(),
            iss: ISSUER.to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            codec.verify(&token),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn test_claims_carry_issuer_and_expiry() {
        let codec = codec();
        let now = fixed_now();
        let token = codec.issue_at(Uuid::new_v4(), now).unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.exp, now.unix_timestamp() + 15 * 60);
    }

    #[test]
    fn test_rejects_empty_secret_and_bad_lifetime() {
        assert!(AccessTokenCodec::new(b"", ISSUER, Duration::minutes(1)).is_err());
        assert!(AccessTokenCodec::new(SECRET, ISSUER, Duration::ZERO).is_err());
    }

    #[test]
    fn test_codec_error_predicates() {
        assert!(CodecError::Expired.is_validation_error());
        assert!(CodecError::InvalidSignature.is_validation_error());
        assert!(CodecError::malformed("x").is_validation_error());
        assert!(!CodecError::encoding("x").is_validation_error());
    }
}
