//! JSON-RPC over HTTP transport

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::transport::{Transport, TransportError};
use crate::{Credentials, Session};

/// Path of the API script below the frontend URL
pub const API_PATH: &str = "api_jsonrpc.php";

/// How login parameters and the session token are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `username` login field, token in an `Authorization: Bearer` header (6.4+)
    #[default]
    Bearer,
    /// `user` login field, token in the request body's `auth` member (before 6.4)
    Legacy,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown auth scheme '{}' (expected bearer or legacy)", other)),
        }
    }
}

/// Monitoring API transport using reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    scheme: AuthScheme,
    next_id: Arc<AtomicU64>,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            scheme: AuthScheme::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn with_scheme(mut self, scheme: AuthScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Full API URL for an endpoint
    ///
    /// Endpoints may be given either as the frontend base URL or as the full
    /// `.../api_jsonrpc.php` URL.
    pub fn api_url(endpoint: &str) -> String {
        let endpoint = endpoint.trim_end_matches('/');
        if endpoint.ends_with(API_PATH) {
            endpoint.to_string()
        } else {
            format!("{}/{}", endpoint, API_PATH)
        }
    }

    fn request_body(&self, method: &str, params: &Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        })
    }

    async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<Value, TransportError> {
        let url = Self::api_url(endpoint);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_send_error)?;

        let status = response.status();
        match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                return Err(TransportError::Unavailable(format!("{} returned {}", url, status)))
            }
            StatusCode::BAD_GATEWAY => {
                return Err(TransportError::BadGateway(format!("{} returned {}", url, status)))
            }
            s if !s.is_success() => {
                return Err(TransportError::Other(format!("{} returned {}", url, status)))
            }
            _ => {}
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Other(format!("Invalid JSON-RPC response: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, credentials), fields(user = %credentials.user()))]
    async fn login(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<String, TransportError> {
        let user_field = match self.scheme {
            AuthScheme::Bearer => "username",
            AuthScheme::Legacy => "user",
        };
        let mut params = serde_json::Map::new();
        params.insert(user_field.to_string(), Value::from(credentials.user()));
        params.insert("password".to_string(), Value::from(credentials.password()));
        let params = Value::Object(params);

        let envelope = self
            .post(endpoint, &self.request_body("user.login", &params), None)
            .await?;

        if let Some(err) = rpc_error(&envelope) {
            return Err(match err {
                TransportError::Rpc { message, data, .. } => {
                    TransportError::Authentication(format!("{} {}", message, data))
                }
                other => other,
            });
        }

        envelope
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TransportError::Other("user.login returned no token".to_string()))
    }

    #[instrument(skip(self, session, params), fields(endpoint = %session.endpoint()))]
    async fn call(
        &self,
        session: &Session,
        method: &str,
        params: &Value,
    ) -> Result<Value, TransportError> {
        let mut body = self.request_body(method, params);
        let token = match self.scheme {
            AuthScheme::Bearer => Some(session.token()),
            AuthScheme::Legacy => {
                body["auth"] = Value::String(session.token().to_string());
                None
            }
        };

        debug!(method = %method, "Submitting API request");
        let envelope = self.post(session.endpoint(), &body, token).await?;

        match rpc_error(&envelope) {
            Some(TransportError::Rpc {
                code,
                message,
                data,
            }) => {
                if is_session_error(&message, &data) {
                    Err(TransportError::Authentication(format!("{} {}", message, data)))
                } else {
                    Err(TransportError::Rpc {
                        code,
                        message,
                        data,
                    })
                }
            }
            Some(other) => Err(other),
            None => Ok(envelope),
        }
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_connect() || err.is_timeout() {
        TransportError::Unavailable(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// Extract the JSON-RPC `error` member, if any
fn rpc_error(envelope: &Value) -> Option<TransportError> {
    let err = envelope.get("error")?;

    Some(TransportError::Rpc {
        code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
        message: err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        data: err
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Errors meaning the session token is no longer accepted
fn is_session_error(message: &str, data: &str) -> bool {
    let text = format!("{} {}", message, data).to_lowercase();
    ["re-login", "not authorised", "not authorized", "session terminated"]
        .iter()
        .any(|needle| text.contains(needle))
}
