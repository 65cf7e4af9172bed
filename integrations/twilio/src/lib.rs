//! SMS delivery through Twilio
//!
//! ## Configuration
//!
//! Required environment variables (each also readable from `<NAME>_FILE`):
//! - `TWILIO_ACCOUNT_SID` - Account SID from the Twilio console
//! - `TWILIO_AUTH_TOKEN` - Auth token from the Twilio console
//! - `TWILIO_FROM_NUMBER` - Number assigned to the account, E.164 format
//!
//! Optional environment variables:
//! - `TWILIO_API_URL` - API base URL (default: `https://api.twilio.com`)
//! - `TWILIO_DEBUG` - Log request details at debug level

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use tracing::{debug, error, info, warn};
use zbxutil_core::{get_secret, mask_token, Error, Logger, Result};

const DEFAULT_API_URL: &str = "https://api.twilio.com";

/// SMS backend trait
#[async_trait]
pub trait SmsBackend: Send + Sync {
    /// Send `body` to `to`, returning the provider's message id
    async fn send(&self, body: &str, to: &str) -> Result<String>;

    /// Backend name
    fn name(&self) -> &str;
}

/// Send the same message to every recipient
///
/// Every recipient is attempted; failures are collected into a single error.
pub async fn broadcast(
    backend: &dyn SmsBackend,
    body: &str,
    recipients: &[&str],
) -> Result<Vec<String>> {
    let mut sids = Vec::new();
    let mut errors = Vec::new();

    for recipient in recipients {
        match backend.send(body, recipient).await {
            Ok(sid) => sids.push(sid),
            Err(e) => {
                warn!(backend = backend.name(), recipient = %recipient, error = %e, "SMS failed");
                errors.push(format!("{}: {}", recipient, e));
            }
        }
    }

    if !errors.is_empty() {
        return Err(Error::SmsError(errors.join("; ")));
    }

    Ok(sids)
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

/// Twilio Programmable Messaging backend
#[derive(Debug, Clone)]
pub struct TwilioBackend {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    logger: Logger,
    debug: bool,
}

impl TwilioBackend {
    /// Create a new Twilio backend from environment variables
    pub fn new(client: Client, logger: Logger) -> Result<Self> {
        let account_sid = get_secret("TWILIO_ACCOUNT_SID")
            .ok_or_else(|| Error::ConfigError("TWILIO_ACCOUNT_SID not configured".to_string()))?;
        let auth_token = get_secret("TWILIO_AUTH_TOKEN")
            .ok_or_else(|| Error::ConfigError("TWILIO_AUTH_TOKEN not configured".to_string()))?;
        let from_number = get_secret("TWILIO_FROM_NUMBER")
            .ok_or_else(|| Error::ConfigError("TWILIO_FROM_NUMBER not configured".to_string()))?;

        let base_url = env::var("TWILIO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let debug = env::var("TWILIO_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            client,
            base_url,
            account_sid,
            auth_token,
            from_number,
            logger,
            debug,
        })
    }

    /// Create a new Twilio backend with explicit credentials
    pub fn with_credentials(
        client: Client,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        logger: Logger,
    ) -> Self {
        Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            logger,
            debug: false,
        }
    }

    /// Point at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_number(&self) -> &str {
        &self.from_number
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl SmsBackend for TwilioBackend {
    async fn send(&self, body: &str, to: &str) -> Result<String> {
        let url = self.messages_url();

        if self.debug {
            self.logger.in_scope(|| {
                debug!(
                    url = %url,
                    account = %mask_token(&self.account_sid),
                    token = %mask_token(&self.auth_token),
                    from = %self.from_number,
                    to = %to,
                    body_bytes = body.len(),
                    "Sending Twilio SMS"
                )
            });
        }

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| {
                self.logger
                    .in_scope(|| error!(to = %to, error = %e, "Twilio HTTP request failed"));
                Error::HttpError(format!("Twilio request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            let detail = serde_json::from_str::<ApiError>(&error_body)
                .map(|e| match e.code {
                    Some(code) => format!("{} (code {})", e.message, code),
                    None => e.message,
                })
                .unwrap_or(error_body);
            self.logger.in_scope(|| {
                error!(to = %to, status = %status, error = %detail, "Twilio returned error status")
            });
            return Err(Error::SmsError(format!("Twilio error: {} - {}", status, detail)));
        }

        let message: MessageResource = response
            .json()
            .await
            .map_err(|e| Error::SmsError(format!("Invalid Twilio response: {}", e)))?;

        self.logger.in_scope(|| {
            info!("Message sent to {}: {}", to, body);
            info!(
                sid = %message.sid,
                status = message.status.as_deref().unwrap_or("unknown"),
                "Response: {}",
                message.sid
            );
        });

        Ok(message.sid)
    }

    fn name(&self) -> &str {
        "twilio"
    }
}
