//! Security alert delivery.
//!
//! Implements [`authgate_auth::SecurityAlerter`] over outbound webhooks.

pub mod adapters;
pub mod error;

pub use adapters::{WebhookAlerter, WebhookConfig, sign_payload};
pub use error::NotificationError;
