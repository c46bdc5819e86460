//! Synchronization core for the drone operator console.
//!
//! The crate is split into focused modules:
//! - `protocol`: JSON wire frames exchanged with the simulator.
//! - `store`: observable state containers fed by the transport client.
//! - `input`: translation of key edges into accelerating motor commands.
//! - `map`: projection of world-frame map objects into canvas draw ops.
//!
//! Nothing in here performs I/O; the transport client in the console
//! application owns the socket and writes into the [`store::Store`].

pub mod input;
pub mod map;
pub mod protocol;
pub mod store;

pub use protocol::{CameraId, FlightMode, Frame, FrameError, MapSnapshot, Outbound, Telemetry};
pub use store::{SharedStore, Store};
