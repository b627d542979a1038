//! # Homecare Messaging
//!
//! [`NotificationDispatcher`](homecare_core::NotificationDispatcher) implementations:
//!
//! - [`TwilioDispatcher`] posts each reminder to the Twilio Messages API, over WhatsApp or SMS
//! - [`LogDispatcher`] only logs, for dry runs and local development
//!
//! Neither dispatcher retries. A failed send is reported to the evaluator once and the next
//! scheduled pass is the only further attempt.

mod config;
mod log_dispatcher;
mod twilio;

pub use config::{Channel, TwilioConfig, DEFAULT_API_BASE};
pub use log_dispatcher::LogDispatcher;
pub use twilio::TwilioDispatcher;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type MessagingResult<T> = std::result::Result<T, MessagingError>;
