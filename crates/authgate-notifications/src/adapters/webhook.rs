use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use authgate_auth::{AlertError, SecurityAlerter, TokenReuseEvent};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use sha2::Sha256;

use crate::error::NotificationError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC of the request body.
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

/// Header naming the event type.
pub const EVENT_HEADER: &str = "X-Authgate-Event";

const TOKEN_REUSE_EVENT: &str = "token_reuse_detected";

#[derive(Clone)]
pub struct WebhookConfig {
    pub url: Url,
    /// Shared secret for `X-Signature-256`. Unsigned when `None`.
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url.as_str())
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Computes the hex HMAC-SHA256 of `payload` under `secret`.
///
/// # Errors
///
/// Returns `NotificationError::InvalidConfig` if the key is rejected.
pub fn sign_payload(payload: &[u8], secret: &str) -> Result<String, NotificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotificationError::InvalidConfig(format!("webhook secret: {e}")))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Posts token reuse events as JSON to a webhook.
pub struct WebhookAlerter {
    http_client: Client,
    config: WebhookConfig,
}

impl WebhookAlerter {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: WebhookConfig) -> Result<Self, NotificationError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    async fn send(&self, event: &TokenReuseEvent) -> Result<(), NotificationError> {
        let payload =
            serde_json::to_vec(event).map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        let mut request = self
            .http_client
            .post(self.config.url.clone())
            .header("Content-Type", "application/json")
            .header(EVENT_HEADER, TOKEN_REUSE_EVENT);

        if let Some(secret) = &self.config.secret {
            let signature = sign_payload(&payload, secret)?;
            request = request.header(SIGNATURE_HEADER, format!("sha256={signature}"));
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(user_id = %event.user_id, "Token reuse alert delivered");
            Ok(())
        } else {
            Err(NotificationError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl SecurityAlerter for WebhookAlerter {
    async fn notify(&self, event: &TokenReuseEvent) -> Result<(), AlertError> {
        self.send(event).await.map_err(AlertError::from)
    }
}
