//! Twilio account settings, resolved once at startup.

use crate::{MessagingError, MessagingResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery channel. WhatsApp addresses carry a `whatsapp:` prefix on both ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Channel {
    #[default]
    WhatsApp,
    Sms,
}

impl Channel {
    /// Formats a phone number as a Twilio address for this channel.
    pub fn address(self, number: &str) -> String {
        match self {
            Channel::WhatsApp => format!("whatsapp:{number}"),
            Channel::Sms => number.to_string(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::WhatsApp => f.write_str("whatsapp"),
            Channel::Sms => f.write_str("sms"),
        }
    }
}

impl FromStr for Channel {
    type Err = MessagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(Channel::WhatsApp),
            "sms" => Ok(Channel::Sms),
            other => Err(MessagingError::InvalidSetting(format!(
                "unknown channel '{other}' (expected whatsapp or sms)"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct TwilioConfig {
    account_sid: String,
    auth_token: String,
    from_number: String,
    channel: Channel,
    api_base: String,
    timeout: Duration,
}

// Keeps the auth token out of logs.
impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("channel", &self.channel)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TwilioConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        channel: Channel,
    ) -> MessagingResult<Self> {
        let account_sid = required(Some(account_sid.into()), "TWILIO_ACCOUNT_SID")?;
        let auth_token = required(Some(auth_token.into()), "TWILIO_AUTH_TOKEN")?;
        let from_number = required(Some(from_number.into()), "TWILIO_FROM_NUMBER")?;

        Ok(Self {
            account_sid,
            auth_token,
            from_number,
            channel,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build a config from raw environment values.
    ///
    /// The three credentials are required. `channel` defaults to WhatsApp and `api_base` to
    /// the public Twilio endpoint.
    pub fn from_env_values(
        account_sid: Option<String>,
        auth_token: Option<String>,
        from_number: Option<String>,
        channel: Option<String>,
        api_base: Option<String>,
    ) -> MessagingResult<Self> {
        let account_sid = required(account_sid, "TWILIO_ACCOUNT_SID")?;
        let auth_token = required(auth_token, "TWILIO_AUTH_TOKEN")?;
        let from_number = required(from_number, "TWILIO_FROM_NUMBER")?;
        let channel = non_blank(channel)
            .map(|c| c.parse::<Channel>())
            .transpose()?
            .unwrap_or_default();

        let config = Self::new(account_sid, auth_token, from_number, channel)?;
        Ok(match non_blank(api_base) {
            Some(base) => config.with_api_base(base),
            None => config,
        })
    }

    /// Overrides the API base URL, e.g. for a local test server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    pub(crate) fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn from_number(&self) -> &str {
        &self.from_number
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

fn required(value: Option<String>, name: &'static str) -> MessagingResult<String> {
    non_blank(value).ok_or(MessagingError::MissingSetting(name))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
