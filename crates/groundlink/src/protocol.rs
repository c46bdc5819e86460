//! Wire protocol spoken with the simulation backend.
//!
//! Frames are flat JSON records over a persistent duplex socket. An
//! inbound frame may bundle several independent payloads (`camera`,
//! `telemetry`, `data` for the tactical map); consumers demultiplex by
//! key presence, not by the envelope `type` alone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoding failure for a single inbound frame. Never fatal to the
/// session; the read loop drops the frame and keeps going.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame is not valid UTF-8")]
    NotUtf8,
}

/// Commands sent to the simulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    MotorCommand {
        vertical: f64,
        roll: f64,
        pitch: f64,
        yaw: f64,
    },
    FlightMode {
        mode: FlightMode,
    },
    CameraSwitch {
        camera: CameraId,
    },
    CameraControl {
        pitch: f64,
        yaw: f64,
    },
}

impl Outbound {
    /// Serialize to the JSON text sent over the socket.
    pub fn encode(&self) -> String {
        // All variants are plain records of primitives; serialization
        // cannot fail for constructible values.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightMode {
    Manual,
    Takeoff,
    Hover,
    Land,
    Rth,
    EmergencyStop,
}

impl Default for FlightMode {
    fn default() -> Self {
        FlightMode::Manual
    }
}

impl FlightMode {
    pub fn label(self) -> &'static str {
        match self {
            FlightMode::Manual => "manual",
            FlightMode::Takeoff => "takeoff",
            FlightMode::Hover => "hover",
            FlightMode::Land => "land",
            FlightMode::Rth => "rth",
            FlightMode::EmergencyStop => "emergency_stop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(FlightMode::Manual),
            "takeoff" => Some(FlightMode::Takeoff),
            "hover" => Some(FlightMode::Hover),
            "land" => Some(FlightMode::Land),
            "rth" => Some(FlightMode::Rth),
            "emergency_stop" => Some(FlightMode::EmergencyStop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraId {
    Front,
    Bottom,
}

impl Default for CameraId {
    fn default() -> Self {
        CameraId::Front
    }
}

impl CameraId {
    pub fn label(self) -> &'static str {
        match self {
            CameraId::Front => "front",
            CameraId::Bottom => "bottom",
        }
    }
}

/// One decoded inbound frame. Every payload is optional; the simulator
/// is free to bundle or split them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub timestamp: Option<f64>,
    pub camera: Option<CameraPayload>,
    pub telemetry: Option<Telemetry>,
    pub data: Option<MapSnapshot>,
}

/// Camera payload carried inside an inbound frame. The image stays an
/// opaque base64 string; the core never decodes pixels.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CameraPayload {
    pub data: Option<String>,
    pub active: Option<CameraId>,
    pub resolution: Option<String>,
    pub fps: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Gps {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl Default for Gps {
    fn default() -> Self {
        Gps {
            lat: 0.0,
            lon: 0.0,
            alt: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotorTemperatures {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

impl Default for MotorTemperatures {
    fn default() -> Self {
        MotorTemperatures {
            fl: 25.0,
            fr: 25.0,
            rl: 25.0,
            rr: 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Temperatures {
    pub body: f64,
    pub motors: MotorTemperatures,
}

impl Default for Temperatures {
    fn default() -> Self {
        Temperatures {
            body: 25.0,
            motors: MotorTemperatures::default(),
        }
    }
}

/// Vehicle state as reported by the simulator. Angles are radians;
/// `heading_degrees` derives the compass heading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    pub altitude: f64,
    pub target: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub gps: Gps,
    /// World-frame position in metres. Older backend builds omit these;
    /// they default to the origin.
    pub x: f64,
    pub y: f64,
    pub battery: f64,
    pub signal_strength: f64,
    pub temperatures: Temperatures,
    pub wind_speed: f64,
    pub flight_mode: FlightMode,
}

impl Default for Telemetry {
    fn default() -> Self {
        Telemetry {
            altitude: 0.0,
            target: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            gps: Gps::default(),
            x: 0.0,
            y: 0.0,
            battery: 100.0,
            signal_strength: 100.0,
            temperatures: Temperatures::default(),
            wind_speed: 0.0,
            flight_mode: FlightMode::Manual,
        }
    }
}

impl Telemetry {
    /// Compass heading in degrees, normalized to [0, 360).
    pub fn heading_degrees(&self) -> f64 {
        let heading = self.yaw.to_degrees() % 360.0;
        if heading < 0.0 {
            heading + 360.0
        } else {
            heading
        }
    }
}

/// Category used to pick the marker style on the tactical map. Unknown
/// strings fold into `Other` rather than failing the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectCategory {
    Windmill,
    Building,
    Tree,
    Vehicle,
    Road,
    Container,
    Manhole,
    Other,
}

impl ObjectCategory {
    fn parse(value: &str) -> Self {
        match value {
            "windmill" => ObjectCategory::Windmill,
            "building" => ObjectCategory::Building,
            "tree" => ObjectCategory::Tree,
            "vehicle" => ObjectCategory::Vehicle,
            "road" => ObjectCategory::Road,
            "container" => ObjectCategory::Container,
            "manhole" => ObjectCategory::Manhole,
            _ => ObjectCategory::Other,
        }
    }
}

impl<'de> Deserialize<'de> for ObjectCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(ObjectCategory::parse(&value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapObject {
    pub category: ObjectCategory,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    pub position: WorldPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MapBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl MapBounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Immutable value replacing the previous snapshot on receipt. No
/// incremental patching.
#[derive(Debug, Clone, Deserialize)]
pub struct MapSnapshot {
    pub bounds: MapBounds,
    pub objects: Vec<MapObject>,
}

/// Decode one inbound frame from its JSON text.
pub fn decode(text: &str) -> Result<Frame, FrameError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode one inbound frame from raw bytes (binary socket messages).
pub fn decode_bytes(bytes: &[u8]) -> Result<Frame, FrameError> {
    let text = std::str::from_utf8(bytes).map_err(|_| FrameError::NotUtf8)?;
    decode(text)
}
