//! Token pair handed to clients.

use serde::{Deserialize, Serialize};

/// Access token plus refresh secret returned by issuance and refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token.
    pub access_token: String,

    /// Opaque refresh secret (base64url).
    pub refresh_token: String,

    /// Always `"Bearer"`.
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}
