use std::net::SocketAddr;

use anyhow::{anyhow, bail, Context, Result};
use groundlink::map::MapMode;

pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8765";

pub const USAGE: &str = "Usage: console link [--endpoint <ws-url>] \
[--sensitivity <0..1>] [--map-mode <heading|north>] \
[--metrics-addr <host:port>] [--verbose]\n\nPositional form is also \
supported: link <ws-url> [...flags...]\n\nThe session reads operator \
commands from stdin; type 'help' once connected.";

#[derive(Clone, Debug)]
pub struct LinkConfig {
    pub endpoint: String,
    pub sensitivity: f64,
    pub map_mode: MapMode,
    pub metrics_addr: Option<SocketAddr>,
    pub verbose: bool,
}

impl LinkConfig {
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut endpoint: Option<String> = None;
        let mut sensitivity: Option<f64> = None;
        let mut map_mode: Option<MapMode> = None;
        let mut metrics_addr: Option<SocketAddr> = None;
        let mut verbose = false;

        let mut idx = 2;
        while idx < args.len() {
            match args[idx].as_str() {
                "--endpoint" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--endpoint requires a value"))?
                        .clone();
                    endpoint = Some(value);
                    idx += 1;
                }
                "--sensitivity" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--sensitivity requires a value"))?
                        .parse::<f64>()
                        .with_context(|| "--sensitivity must be a number".to_string())?;
                    if !(0.0..=1.0).contains(&value) {
                        bail!("--sensitivity must be between 0 and 1");
                    }
                    sensitivity = Some(value);
                    idx += 1;
                }
                "--map-mode" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--map-mode requires a value"))?;
                    map_mode = Some(match value.as_str() {
                        "heading" => MapMode::HeadingLocked,
                        "north" => MapMode::NorthUp,
                        other => bail!("--map-mode must be 'heading' or 'north', got '{other}'"),
                    });
                    idx += 1;
                }
                "--metrics-addr" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--metrics-addr requires a value"))?
                        .parse::<SocketAddr>()
                        .with_context(|| "--metrics-addr must be host:port".to_string())?;
                    metrics_addr = Some(value);
                    idx += 1;
                }
                "--verbose" => {
                    verbose = true;
                    idx += 1;
                }
                arg if arg.starts_with('-') => {
                    bail!("Unrecognised flag: {arg}\n\n{USAGE}");
                }
                other => {
                    if endpoint.is_some() {
                        bail!("Unexpected argument: {other}\n\n{USAGE}");
                    }
                    endpoint = Some(other.to_string());
                    idx += 1;
                }
            }
        }

        Ok(Self {
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            sensitivity: sensitivity.unwrap_or(0.5),
            map_mode: map_mode.unwrap_or(MapMode::HeadingLocked),
            metrics_addr,
            verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(rest: &[&str]) -> Vec<String> {
        let mut all = vec!["console".to_string(), "link".to_string()];
        all.extend(rest.iter().map(|s| s.to_string()));
        all
    }

    #[test]
    fn defaults_apply_without_flags() {
        let config = LinkConfig::from_args(&args(&[])).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.sensitivity, 0.5);
        assert_eq!(config.map_mode, MapMode::HeadingLocked);
        assert!(config.metrics_addr.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn flags_and_positional_endpoint_parse() {
        let config = LinkConfig::from_args(&args(&[
            "ws://10.0.0.2:9000",
            "--sensitivity",
            "0.8",
            "--map-mode",
            "north",
            "--verbose",
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "ws://10.0.0.2:9000");
        assert_eq!(config.sensitivity, 0.8);
        assert_eq!(config.map_mode, MapMode::NorthUp);
        assert!(config.verbose);
    }

    #[test]
    fn out_of_range_sensitivity_is_rejected() {
        assert!(LinkConfig::from_args(&args(&["--sensitivity", "1.5"])).is_err());
        assert!(LinkConfig::from_args(&args(&["--sensitivity", "-0.1"])).is_err());
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(LinkConfig::from_args(&args(&["--warp-factor", "9"])).is_err());
        assert!(LinkConfig::from_args(&args(&["--map-mode", "sideways"])).is_err());
    }
}
