/// WhatsApp delivery
///
/// [`TwilioWhatsApp`] posts to Twilio's Messages API with HTTP basic auth.
/// [`LogSender`] logs and records messages for development and tests.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use super::NotifyError;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends `body` to the phone number `to` (E.164, without the channel prefix)
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number registered for WhatsApp
    pub from_number: String,
    pub timeout_secs: u64,
    /// Overridable for tests against a local mock
    pub api_base: String,
}

#[derive(Clone)]
pub struct TwilioWhatsApp {
    http: Client,
    config: TwilioConfig,
}

fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

impl TwilioWhatsApp {
    pub fn new(config: TwilioConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioWhatsApp {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let from = whatsapp_address(&self.config.from_number);
        let to_address = whatsapp_address(to);
        let form = [("From", from.as_str()), ("To", to_address.as_str()), ("Body", body)];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("Twilio request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, to = %to, "Twilio rejected WhatsApp message");
            return Err(NotifyError::Delivery(format!("Twilio returned {}: {}", status, detail)));
        }

        info!(to = %to, "WhatsApp message sent");
        Ok(())
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Default)]
pub struct LogSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl LogSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(to, body)` pairs "sent" so far
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        info!(to = %to, "WhatsApp message (not sent, Twilio not configured)");

        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), body.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+14155238886".to_string(),
            timeout_secs: 10,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    #[test]
    fn test_whatsapp_address() {
        assert_eq!(whatsapp_address("+923001234567"), "whatsapp:+923001234567");
        assert_eq!(whatsapp_address("whatsapp:+1"), "whatsapp:+1");
    }

    #[test]
    fn test_messages_url() {
        let sender = TwilioWhatsApp::new(config()).unwrap();
        assert_eq!(
            sender.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_delivery_error() {
        let mut cfg = config();
        cfg.api_base = "http://127.0.0.1:9".to_string();
        cfg.timeout_secs = 2;
        let sender = TwilioWhatsApp::new(cfg).unwrap();

        let result = sender.send("+923001234567", "hi").await;
        assert!(matches!(result, Err(NotifyError::Delivery(_))));
    }

    #[tokio::test]
    async fn test_log_sender_records() {
        let sender = LogSender::new();
        sender.send("+1", "code 123456").await.unwrap();
        assert_eq!(sender.sent(), vec![("+1".to_string(), "code 123456".to_string())]);
    }
}
