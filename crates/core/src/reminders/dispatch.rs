//! Outbound notification seam.

use async_trait::async_trait;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("provider rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Sends one text message to one recipient.
///
/// Implementations must not retry internally: one call is one delivery attempt.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), DispatchError>;
}
