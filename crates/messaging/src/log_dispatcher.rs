use async_trait::async_trait;
use homecare_core::{DispatchError, NotificationDispatcher};

/// Logs every reminder instead of sending it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, to: &str, body: &str) -> Result<(), DispatchError> {
        if to.trim().is_empty() {
            return Err(DispatchError::InvalidRecipient(to.to_string()));
        }
        tracing::info!(to, "dry run, not sending: {}", body);
        Ok(())
    }
}
