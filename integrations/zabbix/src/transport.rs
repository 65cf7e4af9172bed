//! Transport seam between the dispatcher and the wire

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::{Credentials, Session};

/// How a single round trip failed, as seen by the transport
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// Credentials or session token rejected
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// Endpoint cannot serve requests right now (overloaded, refusing connections)
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Gateway in front of the endpoint failed
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// The API answered with a JSON-RPC error object
    #[error("API error {code}: {message} {data}")]
    Rpc {
        code: i64,
        message: String,
        data: String,
    },

    #[error("{0}")]
    Other(String),
}

/// One network round trip against a monitoring API endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Exchange credentials for a session token at `endpoint`
    async fn login(&self, endpoint: &str, credentials: &Credentials)
        -> Result<String, TransportError>;

    /// Submit `method` on an established session
    ///
    /// Returns the whole response envelope; unwrapping `result` is left to
    /// the caller.
    async fn call(
        &self,
        session: &Session,
        method: &str,
        params: &Value,
    ) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn login(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<String, TransportError> {
        (**self).login(endpoint, credentials).await
    }

    async fn call(
        &self,
        session: &Session,
        method: &str,
        params: &Value,
    ) -> Result<Value, TransportError> {
        (**self).call(session, method, params).await
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-memory transport with per-endpoint scripted outcomes

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub endpoint: String,
        pub method: String,
        pub params: Value,
    }

    /// Unscripted logins succeed with `token@<endpoint>`; unscripted calls
    /// succeed with an empty result list.
    #[derive(Default)]
    pub struct ScriptedTransport {
        logins: Mutex<HashMap<String, VecDeque<Result<String, TransportError>>>>,
        calls: Mutex<VecDeque<Result<Value, TransportError>>>,
        login_log: Mutex<Vec<String>>,
        call_log: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn script_login(&self, endpoint: &str, outcome: Result<String, TransportError>) {
            self.logins
                .lock()
                .unwrap()
                .entry(endpoint.to_string())
                .or_default()
                .push_back(outcome);
        }

        pub fn script_call(&self, outcome: Result<Value, TransportError>) {
            self.calls.lock().unwrap().push_back(outcome);
        }

        pub fn script_result(&self, result: Value) {
            self.script_call(Ok(json!({"jsonrpc": "2.0", "result": result, "id": 1})));
        }

        pub fn logins(&self) -> Vec<String> {
            self.login_log.lock().unwrap().clone()
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.call_log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn login(
            &self,
            endpoint: &str,
            _credentials: &Credentials,
        ) -> Result<String, TransportError> {
            self.login_log.lock().unwrap().push(endpoint.to_string());
            self.logins
                .lock()
                .unwrap()
                .get_mut(endpoint)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(format!("token@{}", endpoint)))
        }

        async fn call(
            &self,
            session: &Session,
            method: &str,
            params: &Value,
        ) -> Result<Value, TransportError> {
            self.call_log.lock().unwrap().push(RecordedCall {
                endpoint: session.endpoint().to_string(),
                method: method.to_string(),
                params: params.clone(),
            });
            self.calls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"jsonrpc": "2.0", "result": [], "id": 1})))
        }
    }
}
