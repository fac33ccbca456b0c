//! SMS dispatch of delivery codes.
//!
//! [`TwilioSmsSender`] posts to the Twilio Messages API when credentials are
//! configured. [`LogSmsSender`] is used otherwise: it writes the code to the
//! debug log and reports that nothing was sent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use freshmart_core::OrderId;
use freshmart_core::order::{OTP_TTL_MINUTES, OtpCode};

use crate::config::TwilioConfig;

/// Twilio REST API base URL.
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Errors that can occur when sending an SMS.
#[derive(Debug, Error)]
pub enum SmsError {
    /// No provider is configured.
    #[error("SMS provider not configured")]
    NotConfigured,

    /// HTTP client could not be built.
    #[error("SMS client configuration error: {0}")]
    Config(String),

    /// HTTP request failed or timed out.
    #[error("SMS request failed: {0}")]
    Request(String),

    /// Provider rejected the message.
    #[error("SMS provider error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Sends text messages to phone numbers.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send `body` to `to`.
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError>;
}

/// Text of the delivery code message.
#[must_use]
pub fn otp_message(code: &OtpCode) -> String {
    format!(
        "Your FreshMart delivery verification code is {}. It expires in {OTP_TTL_MINUTES} minutes.",
        code.as_str()
    )
}

/// Send the delivery code for `order` to `phone`.
///
/// Returns whether the provider accepted the message. Failures are logged
/// and never propagated.
pub async fn send_otp(sender: &dyn SmsSender, order: OrderId, phone: &str, code: &OtpCode) -> bool {
    match sender.send(phone, &otp_message(code)).await {
        Ok(()) => {
            debug!(order_id = %order, "Delivery code sent");
            true
        }
        Err(SmsError::NotConfigured) => {
            warn!(order_id = %order, "SMS not configured, delivery code not sent");
            false
        }
        Err(e) => {
            warn!(order_id = %order, error = %e, "Failed to send delivery code");
            false
        }
    }
}

/// Twilio Messages API client.
#[derive(Clone)]
pub struct TwilioSmsSender {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: SecretString,
    from: String,
}

impl std::fmt::Debug for TwilioSmsSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioSmsSender")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

/// Error body returned by Twilio.
#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    message: Option<String>,
}

impl TwilioSmsSender {
    /// Create a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Config` if the HTTP client cannot be built.
    pub fn new(config: &TwilioConfig, timeout: Duration) -> Result<Self, SmsError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SmsError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: TWILIO_API_BASE.to_owned(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from: config.from.clone(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    #[instrument(skip(self, body))]
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        let response = self
            .client
            .post(format!(
                "{}/Accounts/{}/Messages.json",
                self.base_url, self.account_sid
            ))
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", to), ("From", self.from.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response
            .json::<TwilioErrorResponse>()
            .await
            .ok()
            .and_then(|r| r.message)
            .unwrap_or_else(|| "Unknown error".to_owned());
        Err(SmsError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Development fallback: logs the message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        debug!(to = %to, body = %body, "SMS not sent (no provider configured)");
        Err(SmsError::NotConfigured)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn code() -> OtpCode {
        OtpCode::from_stored("482913").unwrap()
    }

    #[test]
    fn test_message_text() {
        assert_eq!(
            otp_message(&code()),
            "Your FreshMart delivery verification code is 482913. It expires in 10 minutes."
        );
    }

    #[tokio::test]
    async fn test_log_sender_reports_not_sent() {
        let sent = send_otp(&LogSmsSender, OrderId::new(1), "0000000000", &code()).await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn test_unreachable_provider_reports_not_sent() {
        let config = TwilioConfig {
            account_sid: "AC123".to_owned(),
            auth_token: SecretString::from("token".to_owned()),
            from: "+15550001111".to_owned(),
        };
        let sender = TwilioSmsSender::new(&config, Duration::from_millis(500))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let err = sender.send("+15550002222", "hi").await.unwrap_err();
        assert!(matches!(err, SmsError::Request(_)));
        assert!(!send_otp(&sender, OrderId::new(1), "+15550002222", &code()).await);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = TwilioConfig {
            account_sid: "AC123".to_owned(),
            auth_token: SecretString::from("super-secret-token".to_owned()),
            from: "+15550001111".to_owned(),
        };
        let sender = TwilioSmsSender::new(&config, Duration::from_secs(1)).unwrap();
        assert!(!format!("{sender:?}").contains("super-secret-token"));
    }
}
