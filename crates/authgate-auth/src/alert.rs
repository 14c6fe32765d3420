//! Security alerting contract.
//!
//! When a consumed refresh token is presented again, the session manager
//! emits a [`TokenReuseEvent`] to a [`SecurityAlerter`]. Delivery is
//! fire-and-forget: the manager spawns the call and only logs failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Structured event describing a detected refresh token replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReuseEvent {
    /// Owner of the replayed token; all of their sessions were revoked.
    pub user_id: Uuid,

    /// IP of the request that replayed the token.
    pub ip: String,

    /// `User-Agent` of the request that replayed the token.
    pub user_agent: String,

    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,

    /// Id of the replayed refresh token record.
    pub token_id: Uuid,
}

/// Errors reported by alert delivery.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The alert could not be delivered (connection, timeout, encoding).
    #[error("Alert delivery failed: {0}")]
    Delivery(String),

    /// The receiver answered with a non-success status.
    #[error("Alert rejected with status {status}")]
    Rejected {
        /// HTTP status returned by the receiver.
        status: u16,
    },

    /// The alerter is misconfigured.
    #[error("Invalid alerter configuration: {0}")]
    InvalidConfig(String),
}

/// Receives token reuse alerts.
#[async_trait]
pub trait SecurityAlerter: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails. Callers log the error and move on.
    async fn notify(&self, event: &TokenReuseEvent) -> Result<(), AlertError>;
}

/// Alerter used when no receiver is configured. Logs the event and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlerter;

#[async_trait]
impl SecurityAlerter for NoopAlerter {
    async fn notify(&self, event: &TokenReuseEvent) -> Result<(), AlertError> {
        tracing::warn!(
            user_id = %event.user_id,
            token_id = %event.token_id,
            ip = %event.ip,
            "Refresh token reuse detected (no alert receiver configured)"
        );
        Ok(())
    }
}
