use authgate_auth::AlertError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receiver responded with status {status}")]
    Rejected { status: u16 },
}

impl From<NotificationError> for AlertError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::InvalidConfig(msg) => AlertError::InvalidConfig(msg),
            NotificationError::SendFailed(msg) => AlertError::Delivery(msg),
            NotificationError::Rejected { status } => AlertError::Rejected { status },
        }
    }
}
