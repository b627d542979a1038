//! Twilio Messages API client.

use crate::config::TwilioConfig;
use crate::MessagingResult;
use async_trait::async_trait;
use homecare_core::{DispatchError, NotificationDispatcher};
use serde::Deserialize;

/// Twilio error codes meaning the `To` address itself is unusable.
const INVALID_RECIPIENT_CODES: &[u32] = &[21211, 21614];

/// Successful `Messages.json` response (only the fields we log).
#[derive(Deserialize)]
struct MessageResource {
    sid: String,
    status: Option<String>,
}

/// Error body returned by Twilio on a non-2xx response.
#[derive(Deserialize)]
struct TwilioErrorBody {
    code: Option<u32>,
    message: Option<String>,
}

/// Sends reminders through Twilio, one POST per message.
#[derive(Clone, Debug)]
pub struct TwilioDispatcher {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioDispatcher {
    pub fn new(config: TwilioConfig) -> MessagingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TwilioConfig {
        &self.config
    }
}

#[async_trait]
impl NotificationDispatcher for TwilioDispatcher {
    async fn send(&self, to: &str, body: &str) -> Result<(), DispatchError> {
        let to = to.trim();
        if to.is_empty() {
            return Err(DispatchError::InvalidRecipient(to.to_string()));
        }

        let channel = self.config.channel();
        let to_address = channel.address(to);
        let from_address = channel.address(self.config.from_number());

        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(self.config.account_sid(), Some(self.config.auth_token()))
            .form(&[
                ("To", to_address.as_str()),
                ("From", from_address.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Transport(format!(
                        "request timed out after {}s",
                        self.config.timeout().as_secs()
                    ))
                } else if e.is_connect() {
                    DispatchError::Transport(format!("could not connect to Twilio: {e}"))
                } else {
                    DispatchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(rejection(status.as_u16(), &raw, to));
        }

        match response.json::<MessageResource>().await {
            Ok(message) => tracing::debug!(
                sid = %message.sid,
                status = message.status.as_deref().unwrap_or("unknown"),
                %channel,
                "twilio accepted message"
            ),
            Err(e) => tracing::debug!("twilio accepted message, unreadable body: {}", e),
        }

        Ok(())
    }
}

fn rejection(status: u16, raw_body: &str, to: &str) -> DispatchError {
    let parsed = serde_json::from_str::<TwilioErrorBody>(raw_body).ok();
    let code = parsed.as_ref().and_then(|b| b.code);

    if code.is_some_and(|c| INVALID_RECIPIENT_CODES.contains(&c)) {
        return DispatchError::InvalidRecipient(to.to_string());
    }

    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| raw_body.trim().to_string());
    DispatchError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Channel;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Form, Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug)]
    struct Captured {
        sid: String,
        authorization: Option<String>,
        form: HashMap<String, String>,
    }

    type ServerState = (Arc<Mutex<Vec<Captured>>>, StatusCode, serde_json::Value);

    async fn messages(
        State((captured, status, reply)): State<ServerState>,
        Path(sid): Path<String>,
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        captured.lock().unwrap().push(Captured {
            sid,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            form,
        });
        (status, Json(reply))
    }

    /// Starts a stand-in for the Twilio API on an ephemeral port.
    async fn fake_twilio(
        status: StatusCode,
        reply: serde_json::Value,
    ) -> (String, Arc<Mutex<Vec<Captured>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/2010-04-01/Accounts/:sid/Messages.json", post(messages))
            .with_state((captured.clone(), status, reply));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), captured)
    }

    fn dispatcher(api_base: &str, channel: Channel) -> TwilioDispatcher {
        let config = TwilioConfig::new("AC123", "token", "+14155238886", channel)
            .unwrap()
            .with_api_base(api_base);
        TwilioDispatcher::new(config).unwrap()
    }

    #[tokio::test]
    async fn posts_whatsapp_message_with_basic_auth() {
        let (base, captured) = fake_twilio(
            StatusCode::CREATED,
            serde_json::json!({"sid": "SM1", "status": "queued"}),
        )
        .await;

        dispatcher(&base, Channel::WhatsApp)
            .send("+25551234", "Hello Jane Doe!")
            .await
            .unwrap();

        let captured = captured.lock().unwrap().clone();
        assert_eq!(captured.len(), 1);
        let request = &captured[0];
        assert_eq!(request.sid, "AC123");
        assert!(request
            .authorization
            .as_deref()
            .is_some_and(|v| v.starts_with("Basic ")));
        assert_eq!(request.form["To"], "whatsapp:+25551234");
        assert_eq!(request.form["From"], "whatsapp:+14155238886");
        assert_eq!(request.form["Body"], "Hello Jane Doe!");
    }

    #[tokio::test]
    async fn sms_channel_sends_bare_numbers() {
        let (base, captured) =
            fake_twilio(StatusCode::CREATED, serde_json::json!({"sid": "SM2"})).await;

        dispatcher(&base, Channel::Sms)
            .send("+25551234", "hi")
            .await
            .unwrap();

        let captured = captured.lock().unwrap().clone();
        assert_eq!(captured[0].form["To"], "+25551234");
        assert_eq!(captured[0].form["From"], "+14155238886");
    }

    #[tokio::test]
    async fn provider_error_is_rejected_with_message() {
        let (base, _) = fake_twilio(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({"code": 20003, "message": "Authenticate", "status": 401}),
        )
        .await;

        let err = dispatcher(&base, Channel::WhatsApp)
            .send("+25551234", "hi")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DispatchError::Rejected {
                status: 401,
                message: "Authenticate".into()
            }
        );
    }

    #[tokio::test]
    async fn invalid_to_number_maps_to_invalid_recipient() {
        let (base, _) = fake_twilio(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"code": 21211, "message": "Invalid 'To' Phone Number"}),
        )
        .await;

        let err = dispatcher(&base, Channel::Sms)
            .send("123", "hi")
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::InvalidRecipient("123".into()));
    }

    #[tokio::test]
    async fn unreachable_api_is_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = dispatcher(&format!("http://{addr}"), Channel::Sms)
            .send("+25551234", "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Transport(_)));
    }

    #[tokio::test]
    async fn blank_recipient_is_rejected_before_any_request() {
        let (base, captured) =
            fake_twilio(StatusCode::CREATED, serde_json::json!({"sid": "SM3"})).await;

        let err = dispatcher(&base, Channel::Sms)
            .send("   ", "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidRecipient(_)));
        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn rejection_falls_back_to_raw_body() {
        assert_eq!(
            rejection(503, "  upstream down ", "+1"),
            DispatchError::Rejected {
                status: 503,
                message: "upstream down".into()
            }
        );
    }
}
