//! Control link between the operator console and the simulation
//! backend.
//!
//! The module is split into focused submodules:
//! - `config`: CLI configuration parsing.
//! - `telemetry`: tracing subscriber and optional Prometheus exporter.
//! - `transport`: the WebSocket client owning the duplex session.
//! - `session`: the interactive headless operator session.

pub use config::LinkConfig;

pub mod config;
mod session;
mod telemetry;
mod transport;

use anyhow::{Context, Result};

/// Parse `console link ...` arguments and run a session to completion.
pub fn run_from_args(args: &[String]) -> Result<()> {
    let config = LinkConfig::from_args(args)?;
    telemetry::init(&config)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(session::run(config))
}
