//! API latency probe
//!
//! Times one `host.get` round trip through the dispatcher and can push the
//! measurement back to the monitoring server as the `api.test` item.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::error;
use zbxutil_core::{DispatchError, Result};

use crate::sender::{Metric, SenderResponse, ZabbixSender};
use crate::transport::Transport;
use crate::ZabbixApi;

/// Item key the measured latency is reported under
pub const API_TEST_KEY: &str = "api.test";

/// Outcome of one probe
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub elapsed: Duration,
    /// Set when the API call itself failed; the latency is still measured
    pub error: Option<DispatchError>,
}

/// Time a `host.get` for `test_host`
pub async fn probe_api<T: Transport>(api: &mut ZabbixApi<T>, test_host: &str) -> ProbeOutcome {
    let start = Instant::now();
    let result = api
        .api_request("host.get", json!({"filter": {"host": test_host}}))
        .await;
    let elapsed = start.elapsed();

    let error = result.err();
    if let Some(err) = &error {
        api.logger()
            .in_scope(|| error!(error = %err, host = %test_host, "Failed API Test"));
    }

    ProbeOutcome { elapsed, error }
}

/// Probe, then report the latency in seconds through `sender`
pub async fn probe_and_report<T: Transport>(
    api: &mut ZabbixApi<T>,
    sender: &ZabbixSender,
    test_host: &str,
) -> Result<(ProbeOutcome, SenderResponse)> {
    let outcome = probe_api(api, test_host).await;
    let metric = Metric::new(test_host, API_TEST_KEY, outcome.elapsed.as_secs_f64());
    let response = sender.send(&[metric]).await?;
    Ok((outcome, response))
}
