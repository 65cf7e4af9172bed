//! Monitoring API client for zbxutil
//!
//! The [`Dispatcher`] executes JSON-RPC calls against a primary endpoint and
//! fails over to backups in order when the primary is unavailable.
//! [`ZabbixApi`] layers the named calls scripts use on top of it, and
//! [`ZabbixSender`] pushes item values over the trapper protocol.

pub mod api;
pub mod dispatcher;
pub mod http;
pub mod probe;
pub mod sender;
pub mod transport;
pub mod types;

// Re-exports
pub use api::ZabbixApi;
pub use dispatcher::{DispatchResult, Dispatcher};
pub use http::{AuthScheme, HttpTransport};
pub use probe::{probe_and_report, probe_api, ProbeOutcome, API_TEST_KEY};
pub use sender::{Metric, SenderResponse, ZabbixSender, DEFAULT_SENDER_PORT};
pub use transport::{Transport, TransportError};
pub use types::{Credentials, Endpoints, Session};
