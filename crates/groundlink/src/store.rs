//! Observable state containers fed by the transport client.
//!
//! Pure data plus named mutation entry points; no I/O. The transport
//! client owns the telemetry/camera fields, the session layer owns the
//! operator preferences, and nothing else writes here — that ownership
//! split is the locking discipline.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::protocol::{CameraId, MapSnapshot, Telemetry};

/// Handle shared between the transport read task and store consumers.
pub type SharedStore = Arc<Mutex<Store>>;

const GIMBAL_PITCH_LIMIT: f64 = 90.0;
const GIMBAL_YAW_LIMIT: f64 = 180.0;

/// Last-known vehicle telemetry together with the source timestamp of
/// the frame that produced it.
#[derive(Debug, Clone, Default)]
pub struct TelemetryState {
    pub telemetry: Telemetry,
    /// Monotonic seconds reported by the simulator, not wall clock.
    pub timestamp: f64,
}

/// Camera feed and gimbal state.
#[derive(Debug, Clone)]
pub struct CameraState {
    /// Latest encoded frame, replaced wholesale. Kept opaque; the core
    /// never decodes pixels.
    pub frame: Option<String>,
    pub active: CameraId,
    pub resolution: String,
    pub fps: f32,
    pub gimbal_pitch: f64,
    pub gimbal_yaw: f64,
    /// How aggressively the attitude overlay fades as the gimbal looks
    /// away from center. 1.0 reaches zero at the mechanical limits.
    pub fade_sensitivity: f64,
    pub attitude_opacity: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        CameraState {
            frame: None,
            active: CameraId::Front,
            resolution: "400x240".into(),
            fps: 0.0,
            gimbal_pitch: 0.0,
            gimbal_yaw: 0.0,
            fade_sensitivity: 1.0,
            attitude_opacity: 1.0,
        }
    }
}

/// Local operator preferences. These survive a disconnect.
#[derive(Debug, Clone)]
pub struct OperatorPrefs {
    pub sensitivity: f64,
}

impl Default for OperatorPrefs {
    fn default() -> Self {
        OperatorPrefs { sensitivity: 0.5 }
    }
}

/// Process-wide console state. All mutation goes through the named
/// setters below.
#[derive(Debug, Clone, Default)]
pub struct Store {
    telemetry: TelemetryState,
    camera: CameraState,
    prefs: OperatorPrefs,
    map: Option<MapSnapshot>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    pub fn telemetry(&self) -> &TelemetryState {
        &self.telemetry
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn prefs(&self) -> &OperatorPrefs {
        &self.prefs
    }

    pub fn map_snapshot(&self) -> Option<&MapSnapshot> {
        self.map.as_ref()
    }

    /// Accept a telemetry frame unless its source timestamp is older
    /// than what we already hold; reordered frames must not regress
    /// state. Returns whether the update was applied.
    pub fn set_telemetry(&mut self, telemetry: Telemetry, timestamp: f64) -> bool {
        if timestamp < self.telemetry.timestamp {
            debug!(
                stale = timestamp,
                current = self.telemetry.timestamp,
                "ignoring reordered telemetry frame"
            );
            return false;
        }
        self.telemetry = TelemetryState {
            telemetry,
            timestamp,
        };
        true
    }

    pub fn set_camera_image(&mut self, frame: String) {
        self.camera.frame = Some(frame);
    }

    pub fn set_active_camera(&mut self, camera: CameraId) {
        self.camera.active = camera;
    }

    pub fn set_camera_stats(&mut self, resolution: String, fps: f32) {
        self.camera.resolution = resolution;
        self.camera.fps = fps;
    }

    /// Point the gimbal; pitch clamps to [-90, 90], yaw wraps into
    /// (-180, 180]. Recomputes the attitude-overlay opacity, which
    /// fades to zero as the camera looks away from center.
    pub fn set_gimbal_angles(&mut self, pitch: f64, yaw: f64) {
        self.camera.gimbal_pitch = pitch.clamp(-GIMBAL_PITCH_LIMIT, GIMBAL_PITCH_LIMIT);
        self.camera.gimbal_yaw = wrap_yaw(yaw);

        let distance =
            (self.camera.gimbal_pitch.powi(2) + self.camera.gimbal_yaw.powi(2)).sqrt();
        let max_distance = (GIMBAL_PITCH_LIMIT.powi(2) + GIMBAL_YAW_LIMIT.powi(2)).sqrt()
            * self.camera.fade_sensitivity;
        self.camera.attitude_opacity = (1.0 - distance / max_distance).max(0.0);
    }

    pub fn set_sensitivity(&mut self, value: f64) {
        self.prefs.sensitivity = value.clamp(0.0, 1.0);
    }

    pub fn set_map_snapshot(&mut self, snapshot: MapSnapshot) {
        self.map = Some(snapshot);
    }

    /// Disconnect policy: connection-derived state returns to defaults
    /// so the panels never show stale vehicle data as live. Operator
    /// preferences survive.
    pub fn reset_to_defaults(&mut self) {
        self.telemetry = TelemetryState::default();
        self.camera = CameraState::default();
        self.map = None;
    }
}

/// Wrap an angle in degrees into (-180, 180].
fn wrap_yaw(yaw: f64) -> f64 {
    let mut wrapped = yaw % 360.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    } else if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}
