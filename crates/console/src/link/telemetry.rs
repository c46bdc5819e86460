//! Tracing and metrics bootstrap for the console process.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

use crate::link::LinkConfig;

/// Install the tracing subscriber. `RUST_LOG` wins over the config's
/// verbosity flag.
pub(crate) fn init(config: &LinkConfig) -> Result<()> {
    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .try_init();
    Ok(())
}

/// Install the Prometheus recorder with its scrape listener. Must run
/// inside the Tokio runtime.
pub(crate) fn install_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus metrics exporter")?;
    info!("metrics exposed at http://{addr}/metrics");
    Ok(())
}
