//! zbxutil
//!
//! Times a monitoring API round trip through the failover dispatcher and,
//! when a trapper is configured, reports the latency as the `api.test` item.

use anyhow::Context;
use tracing::{info, instrument, warn};
use zbxutil_core::{init_tracing, parse_debug_argument, KillSwitch, Logger, DEFAULT_LOGGER_NAME};
use zbxutil_zabbix::{probe_and_report, probe_api, ZabbixApi};

mod config;

use config::Config;

#[tokio::main]
#[instrument]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI args
    init_tracing(parse_debug_argument());

    // Load configuration
    let config_path = std::env::var("ZBXUTIL_CONFIG").ok();
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    info!(
        primary = %config.endpoints.primary(),
        backups = config.endpoints.backups().len(),
        "Starting API probe"
    );

    let logger = Logger::to_file(&config.log_file, DEFAULT_LOGGER_NAME)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
    let kill_switch = KillSwitch::new(&config.kill_switch);

    let mut api = ZabbixApi::connect(
        config.endpoints.clone(),
        config.credentials.clone(),
        config.auth_scheme,
        logger,
        &kill_switch,
        false,
    )?;

    let outcome = match config.sender() {
        Some(sender) => {
            let (outcome, response) = probe_and_report(&mut api, &sender, &config.test_host).await?;
            info!(
                processed = response.processed,
                failed = response.failed,
                "Latency reported"
            );
            outcome
        }
        None => probe_api(&mut api, &config.test_host).await,
    };

    println!("{:.6}", outcome.elapsed.as_secs_f64());

    if let Err(e) = api.dispatcher_mut().logout().await {
        warn!(error = %e, "Logout failed");
    }

    match outcome.error {
        Some(err) if err.is_fatal() => Err(err).context("API probe failed"),
        Some(err) => {
            warn!(error = %err, "API probe call failed");
            Ok(())
        }
        None => {
            info!(elapsed_ms = outcome.elapsed.as_millis() as u64, "API probe complete");
            Ok(())
        }
    }
}
