pub mod webhook;

pub use webhook::{WebhookAlerter, WebhookConfig, sign_payload};
