//! Failover request dispatcher
//!
//! Holds at most one session, established lazily against the primary
//! endpoint. When the primary reports itself unavailable the backups are
//! tried strictly in order and the first one that accepts the login becomes
//! the session. Authentication failures end the call immediately.

use serde_json::Value;
use tracing::{debug, error, warn};
use zbxutil_core::{DispatchError, KillSwitch, Logger};

use crate::transport::{Transport, TransportError};
use crate::{Credentials, Endpoints, Session};

/// Result of a dispatched call
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Executes monitoring API calls with ordered endpoint failover
///
/// `dispatch` takes `&mut self`; callers that need concurrency create one
/// dispatcher per task.
pub struct Dispatcher<T> {
    transport: T,
    endpoints: Endpoints,
    credentials: Credentials,
    logger: Logger,
    session: Option<Session>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, endpoints: Endpoints, credentials: Credentials, logger: Logger) -> Self {
        Self {
            transport,
            endpoints,
            credentials,
            logger,
            session: None,
        }
    }

    /// Refuse construction while the kill switch is engaged, unless `critical`
    pub fn with_kill_switch(
        self,
        kill_switch: &KillSwitch,
        critical: bool,
    ) -> zbxutil_core::Result<Self> {
        self.logger.in_scope(|| kill_switch.check(critical))?;
        Ok(self)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Endpoint the current session is bound to
    pub fn session_endpoint(&self) -> Option<&str> {
        self.session.as_ref().map(Session::endpoint)
    }

    /// Drop the session; the next call logs in again from the primary
    pub fn invalidate(&mut self) {
        self.session = None;
    }

    /// Log out on the remote side and drop the session
    ///
    /// The session is dropped even when the remote call fails.
    pub async fn logout(&mut self) -> DispatchResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        match self
            .transport
            .call(&session, "user.logout", &Value::Array(Vec::new()))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => Err(self.fail("user.logout", DispatchError::Unknown(e.to_string()))),
        }
    }

    /// Execute `method` with `params` and return the unwrapped `result`
    pub async fn dispatch(&mut self, method: &str, params: &Value) -> DispatchResult<Value> {
        if method.is_empty() {
            return Err(self.fail(
                method,
                DispatchError::Unknown("empty function name".to_string()),
            ));
        }

        let session = self.establish(method).await?;
        self.submit(&session, method, params).await
    }

    /// Reuse the held session or log in, failing over on unavailability
    async fn establish(&mut self, method: &str) -> DispatchResult<Session> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }

        let primary = self.endpoints.primary().to_string();
        let mut reason = match self.transport.login(&primary, &self.credentials).await {
            Ok(token) => return Ok(self.adopt(primary, token)),
            Err(TransportError::Unavailable(reason)) => reason,
            Err(e) => return Err(self.fail(method, Self::login_failure(e))),
        };

        let mut failed = primary.clone();
        let mut attempted = vec![primary];

        for backup in self.endpoints.backups().to_vec() {
            self.logger.in_scope(|| {
                warn!(
                    endpoint = %failed,
                    reason = %reason,
                    next = %backup,
                    "Endpoint is not responding, trying next"
                )
            });
            attempted.push(backup.clone());

            match self.transport.login(&backup, &self.credentials).await {
                Ok(token) => return Ok(self.adopt(backup, token)),
                Err(TransportError::Unavailable(next_reason)) => {
                    reason = next_reason;
                    failed = backup;
                }
                Err(e) => return Err(self.fail(method, Self::login_failure(e))),
            }
        }

        self.logger
            .in_scope(|| debug!(endpoint = %failed, reason = %reason, "Last endpoint unavailable"));
        Err(self.fail(method, DispatchError::AllEndpointsUnavailable { attempted }))
    }

    async fn submit(
        &mut self,
        session: &Session,
        method: &str,
        params: &Value,
    ) -> DispatchResult<Value> {
        match self.transport.call(session, method, params).await {
            Ok(envelope) => self.unwrap_envelope(method, envelope),
            Err(TransportError::BadGateway(reason)) => {
                self.logger
                    .in_scope(|| debug!(method = %method, reason = %reason, "Bad gateway, retrying once"));

                match self.transport.call(session, method, params).await {
                    Ok(envelope) => self.unwrap_envelope(method, envelope),
                    Err(e @ TransportError::BadGateway(_)) => {
                        Err(self.fail(method, DispatchError::TransientUpstream(e.to_string())))
                    }
                    Err(e) => Err(self.classify_submit_error(method, e)),
                }
            }
            Err(e) => Err(self.classify_submit_error(method, e)),
        }
    }

    /// Map a non-502 submission failure, dropping the session where it is no longer usable
    fn classify_submit_error(&mut self, method: &str, err: TransportError) -> DispatchError {
        let err = match err {
            TransportError::Authentication(reason) => {
                self.invalidate();
                DispatchError::Authentication(reason)
            }
            e @ TransportError::Unavailable(_) => {
                // Next call starts from the primary again and can fail over
                self.invalidate();
                DispatchError::Unknown(e.to_string())
            }
            e => DispatchError::Unknown(e.to_string()),
        };
        self.fail(method, err)
    }

    fn adopt(&mut self, endpoint: String, token: String) -> Session {
        self.logger
            .in_scope(|| debug!(endpoint = %endpoint, "Session established"));
        let session = Session::new(endpoint, token);
        self.session = Some(session.clone());
        session
    }

    fn unwrap_envelope(&self, method: &str, envelope: Value) -> DispatchResult<Value> {
        match envelope {
            Value::Object(mut fields) => fields.remove("result").ok_or_else(|| {
                self.fail(
                    method,
                    DispatchError::Unknown("response envelope carried no result".to_string()),
                )
            }),
            other => Err(self.fail(
                method,
                DispatchError::Unknown(format!("unexpected response envelope: {}", other)),
            )),
        }
    }

    fn login_failure(err: TransportError) -> DispatchError {
        match err {
            TransportError::Authentication(reason) => DispatchError::Authentication(reason),
            TransportError::Rpc { message, data, .. } => {
                DispatchError::Authentication(format!("{} {}", message, data))
            }
            other => DispatchError::Unknown(other.to_string()),
        }
    }

    /// Log a terminal failure and hand it back
    fn fail(&self, method: &str, err: DispatchError) -> DispatchError {
        self.logger
            .in_scope(|| error!(method = %method, error = %err, "Request failed"));
        err
    }
}
