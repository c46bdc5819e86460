//! Interactive headless operator session.
//!
//! Stands in for the GUI presentation layer: stdin lines become key
//! edges and console actions, inbound state lands in the shared store,
//! and the tactical map can be rendered on demand. One event at a time
//! mutates state; no two store writers ever race.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use groundlink::input::{CommandTranslator, ControlKey};
use groundlink::map::{render_plan, CanvasSize, DrawOp, MapMode, Pose, Viewport};
use groundlink::protocol::{CameraId, FlightMode, Outbound};
use groundlink::store::SharedStore;
use groundlink::Store;

use super::telemetry;
use super::transport::{LinkClient, LinkEvent};
use super::LinkConfig;

/// Matches the tactical map canvas of the operator panels.
const MAP_CANVAS: CanvasSize = CanvasSize {
    width: 400.0,
    height: 400.0,
};

const SESSION_HELP: &str = "Session commands:
  hold <key>      press a control key (forward, back, left, right,
                  yaw_left, yaw_right, up, down)
  release <key>   release a control key
  mode <m>        set flight mode (manual, takeoff, hover, land, rth,
                  emergency_stop)
  camera <c>      switch camera (front, bottom)
  gimbal <p> <y>  point the camera gimbal (degrees)
  sens <0..1>     set control sensitivity
  zoom <in|out>   zoom the tactical map
  pan <dx> <dy>   pan the tactical map by screen pixels
  map             render the tactical map plan
  status          log link and vehicle status
  quit            close the link and exit";

/// Run one operator session to completion. Returns when the link
/// closes, stdin ends, or the operator quits; reconnecting is the
/// caller's decision.
pub(crate) async fn run(config: LinkConfig) -> Result<()> {
    if let Some(addr) = config.metrics_addr {
        telemetry::install_metrics(addr)?;
    }

    let store: SharedStore = Arc::new(Mutex::new(Store::new()));
    if let Ok(mut guard) = store.lock() {
        guard.set_sensitivity(config.sensitivity);
    }

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let client = LinkClient::connect(&config.endpoint, store.clone(), event_tx).await?;
    println!("Linked to {}; type 'help' for session commands", config.endpoint);

    let mut session = Session {
        client,
        store,
        translator: CommandTranslator::new(),
        viewport: Viewport::new(),
        map_mode: config.map_mode,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; closing link");
                break;
            }
            event = events.recv() => match event {
                Some(LinkEvent::ModeChanged(mode)) => session.on_mode_changed(mode),
                Some(LinkEvent::Closed { .. }) | None => break,
            },
            _ = heartbeat.tick() => session.log_status(),
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !session.handle_line(line.trim()) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("stdin error: {err}");
                    break;
                }
            },
        }
    }

    session.client.close().await;
    Ok(())
}

struct Session {
    client: LinkClient,
    store: SharedStore,
    translator: CommandTranslator,
    viewport: Viewport,
    map_mode: MapMode,
}

impl Session {
    fn sensitivity(&self) -> f64 {
        match self.store.lock() {
            Ok(guard) => guard.prefs().sensitivity,
            Err(_) => 0.5,
        }
    }

    /// Hover reported by the vehicle is a hard reset point: speed
    /// zeroes and the zero command overrides any residual coast.
    fn on_mode_changed(&mut self, mode: FlightMode) {
        info!(mode = mode.label(), "flight mode changed");
        if let Some(cmd) = self.translator.flight_mode_changed(mode) {
            self.client.send(cmd.into_outbound());
        }
    }

    fn log_status(&self) {
        let Ok(guard) = self.store.lock() else {
            return;
        };
        let telemetry = &guard.telemetry().telemetry;
        info!(
            link = self.client.state().label(),
            mode = telemetry.flight_mode.label(),
            altitude = telemetry.altitude,
            battery = telemetry.battery,
            heading = format!("{:.0}", telemetry.heading_degrees()),
            speed = format!("{:.2}", self.translator.speed()),
            "status"
        );
    }

    /// Process one operator line. Unknown commands warn and change no
    /// state. Returns false when the session should end.
    fn handle_line(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        match parts.next() {
            None => {}
            Some("hold") => self.key_edge(parts.next(), true),
            Some("release") => self.key_edge(parts.next(), false),
            Some("mode") => match parts.next().and_then(FlightMode::parse) {
                Some(mode) => {
                    self.client.send(Outbound::FlightMode { mode });
                    info!(mode = mode.label(), "flight mode requested");
                }
                None => warn!("usage: mode <manual|takeoff|hover|land|rth|emergency_stop>"),
            },
            Some("camera") => match parts.next() {
                Some("front") => self.switch_camera(CameraId::Front),
                Some("bottom") => self.switch_camera(CameraId::Bottom),
                _ => warn!("usage: camera <front|bottom>"),
            },
            Some("gimbal") => {
                let pitch = parts.next().and_then(|v| v.parse::<f64>().ok());
                let yaw = parts.next().and_then(|v| v.parse::<f64>().ok());
                match (pitch, yaw) {
                    (Some(pitch), Some(yaw)) => self.point_gimbal(pitch, yaw),
                    _ => warn!("usage: gimbal <pitch-deg> <yaw-deg>"),
                }
            }
            Some("sens") => match parts.next().and_then(|v| v.parse::<f64>().ok()) {
                Some(value) => {
                    if let Ok(mut guard) = self.store.lock() {
                        guard.set_sensitivity(value);
                        info!(sensitivity = guard.prefs().sensitivity, "sensitivity set");
                    }
                }
                None => warn!("usage: sens <0..1>"),
            },
            Some("zoom") => match parts.next() {
                Some("in") => {
                    self.viewport.wheel(-1.0);
                    info!(zoom = format!("{:.2}", self.viewport.zoom()), "map zoom");
                }
                Some("out") => {
                    self.viewport.wheel(1.0);
                    info!(zoom = format!("{:.2}", self.viewport.zoom()), "map zoom");
                }
                _ => warn!("usage: zoom <in|out>"),
            },
            Some("pan") => {
                let dx = parts.next().and_then(|v| v.parse::<f64>().ok());
                let dy = parts.next().and_then(|v| v.parse::<f64>().ok());
                match (dx, dy) {
                    (Some(dx), Some(dy)) => {
                        // A synthetic drag from the origin pans by the
                        // raw pixel delta, exactly like a pointer drag.
                        self.viewport.begin_drag(0.0, 0.0);
                        self.viewport.drag_move(dx, dy);
                        self.viewport.end_drag();
                    }
                    _ => warn!("usage: pan <dx> <dy>"),
                }
            }
            Some("map") => self.render_map(),
            Some("status") => self.log_status(),
            Some("help") => println!("{SESSION_HELP}"),
            Some("quit") | Some("exit") => return false,
            Some(other) => warn!("unknown command '{other}'; type 'help'"),
        }
        true
    }

    fn key_edge(&mut self, key: Option<&str>, pressed: bool) {
        let Some(key) = key.and_then(ControlKey::parse) else {
            // Unrecognized key codes produce no state change.
            warn!("unknown control key; type 'help' for the list");
            return;
        };
        let sensitivity = self.sensitivity();
        let command = if pressed {
            self.translator.press(key, sensitivity)
        } else {
            self.translator.release(key, sensitivity)
        };
        if let Some(cmd) = command {
            self.client.send(cmd.into_outbound());
        }
    }

    fn switch_camera(&mut self, camera: CameraId) {
        if let Ok(mut guard) = self.store.lock() {
            guard.set_active_camera(camera);
        }
        self.client.send(Outbound::CameraSwitch { camera });
        info!(camera = camera.label(), "camera switched");
    }

    fn point_gimbal(&mut self, pitch: f64, yaw: f64) {
        let Ok(mut guard) = self.store.lock() else {
            return;
        };
        guard.set_gimbal_angles(pitch, yaw);
        let camera = guard.camera();
        let (pitch, yaw) = (camera.gimbal_pitch, camera.gimbal_yaw);
        let opacity = camera.attitude_opacity;
        drop(guard);

        self.client.send(Outbound::CameraControl { pitch, yaw });
        info!(
            pitch,
            yaw,
            opacity = format!("{opacity:.2}"),
            "gimbal pointed"
        );
    }

    fn render_map(&self) {
        let Ok(guard) = self.store.lock() else {
            return;
        };
        let telemetry = &guard.telemetry().telemetry;
        let pose = Pose {
            x: telemetry.x,
            y: telemetry.y,
            yaw: telemetry.yaw,
        };
        let plan = render_plan(
            guard.map_snapshot(),
            &pose,
            &self.viewport,
            MAP_CANVAS,
            self.map_mode,
        );
        if plan.is_placeholder() {
            info!("map: waiting for map data");
            return;
        }
        let markers = plan
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Marker { .. }))
            .count();
        info!(
            ops = plan.ops.len(),
            markers,
            zoom = format!("{:.2}", self.viewport.zoom()),
            heading = format!("{:.0}", telemetry.heading_degrees()),
            "map plan ready"
        );
    }
}
