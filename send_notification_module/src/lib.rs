//! Outbound client for the IrssiNotifier message API.
//!
//! The relay takes a single `GET /API/Message` whose query carries the API
//! token in the clear and the already-encrypted nick, channel and message.

use std::env;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://irssinotifier.appspot.com";
pub const MESSAGE_PATH: &str = "/API/Message";
pub const PROTOCOL_VERSION: u32 = 13;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum SendNotificationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(String),
}

/// Query parameters of one relay message. `nick`, `channel` and `message`
/// must already be encrypted and transport-encoded.
#[derive(Clone, Serialize)]
pub struct NotificationPayload {
    #[serde(rename = "apiToken")]
    pub api_token: String,
    pub nick: String,
    pub channel: String,
    pub message: String,
    pub version: u32,
}

impl NotificationPayload {
    pub fn new(
        api_token: impl Into<String>,
        nick: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into(),
            nick: nick.into(),
            channel: channel.into(),
            message: message.into(),
            version: PROTOCOL_VERSION,
        }
    }
}

impl fmt::Debug for NotificationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationPayload")
            .field("api_token", &"***")
            .field("nick", &self.nick)
            .field("channel", &self.channel)
            .field("message_len", &self.message.len())
            .field("version", &self.version)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SendNotificationResponse {
    pub status: u16,
    pub body: String,
}

impl SendNotificationResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct NotifierClient {
    api_base_url: String,
    client: reqwest::blocking::Client,
}

impl NotifierClient {
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Result<Self, SendNotificationError> {
        let api_base_url = api_base_url.into().trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&api_base_url)
            .map_err(|err| SendNotificationError::InvalidBaseUrl(format!("{}: {}", api_base_url, err)))?;
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(SendNotificationError::InvalidBaseUrl(api_base_url));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_base_url,
            client,
        })
    }

    /// Builds a client from `IRSSINOTIFIER_API_BASE_URL` and
    /// `IRSSINOTIFY_HTTP_TIMEOUT_SECS`, falling back to the public relay.
    pub fn from_env() -> Result<Self, SendNotificationError> {
        dotenvy::dotenv().ok();
        let api_base_url = env::var("IRSSINOTIFIER_API_BASE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let timeout = env::var("IRSSINOTIFY_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        Self::new(api_base_url, timeout)
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn message_url(&self) -> String {
        format!("{}{}", self.api_base_url, MESSAGE_PATH)
    }

    /// Issues the GET. Any HTTP status counts as a completed request; only
    /// transport failures are errors.
    pub fn send(
        &self,
        payload: &NotificationPayload,
    ) -> Result<SendNotificationResponse, SendNotificationError> {
        let response = self
            .client
            .get(self.message_url())
            .query(payload)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        let result = SendNotificationResponse { status, body };
        if result.is_success() {
            info!("irssinotifier accepted message (status {})", status);
        } else {
            warn!(
                "irssinotifier returned status {}: {}",
                status,
                result.body.trim()
            );
        }
        Ok(result)
    }
}

/// One-shot send through a client configured from the environment.
pub fn send_notification(
    payload: &NotificationPayload,
) -> Result<SendNotificationResponse, SendNotificationError> {
    NotifierClient::from_env()?.send(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_debug_hides_token() {
        let payload = NotificationPayload::new("secret-token", "n", "c", "m");
        let rendered = format!("{:?}", payload);
        assert!(!rendered.contains("secret-token"));
        assert_eq!(payload.version, PROTOCOL_VERSION);
    }

    #[test]
    fn message_url_joins_base_and_path() {
        let client =
            NotifierClient::new("https://relay.example.com/", Duration::from_secs(1)).expect("client");
        assert_eq!(client.message_url(), "https://relay.example.com/API/Message");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = NotifierClient::new("ftp://relay.example.com", Duration::from_secs(1))
            .expect_err("ftp base url");
        assert!(matches!(err, SendNotificationError::InvalidBaseUrl(_)));

        let err = NotifierClient::new("not a url", Duration::from_secs(1)).expect_err("garbage");
        assert!(matches!(err, SendNotificationError::InvalidBaseUrl(_)));
    }

    #[test]
    fn response_success_range() {
        let ok = SendNotificationResponse {
            status: 204,
            body: String::new(),
        };
        let failed = SendNotificationResponse {
            status: 401,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!failed.is_success());
    }
}
