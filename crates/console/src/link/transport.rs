//! WebSocket transport client owning the single duplex session with
//! the simulator.
//!
//! One reader task decodes inbound frames and writes them into the
//! shared store; one writer task owns the sink so outbound sends are
//! single atomic serialize-and-transmit operations. Commands are
//! perishable: anything submitted while the session is not open is
//! dropped, never queued.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use groundlink::protocol::{self, FlightMode, Frame, Outbound};
use groundlink::store::SharedStore;

const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of the logical session. Owned by the client; the store
/// only ever sees the values the client pushed into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed(String),
}

impl ConnectionState {
    pub(crate) fn label(&self) -> &str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed(_) => "closed",
        }
    }
}

/// Events the session layer reacts to. Everything else lands in the
/// store directly.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkEvent {
    ModeChanged(FlightMode),
    Closed { reason: String },
}

enum WriterMsg {
    Frame(Outbound),
    Shutdown,
}

/// Handle for one connected session. Dropping it abandons the tasks;
/// prefer [`LinkClient::close`].
pub(crate) struct LinkClient {
    outbound: mpsc::UnboundedSender<WriterMsg>,
    state: Arc<Mutex<ConnectionState>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl LinkClient {
    /// Establish one logical session. The caller decides whether to
    /// reconnect after a close; the client never does so on its own.
    pub(crate) async fn connect(
        endpoint: &str,
        store: SharedStore,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Self> {
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));

        let (socket, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .with_context(|| format!("failed to connect to {endpoint}"))?;
        set_state(&state, ConnectionState::Open);
        info!("connected to {endpoint}");

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<WriterMsg>();

        let writer_state = state.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                match msg {
                    WriterMsg::Frame(frame) => {
                        if let Err(err) = sink.send(Message::Text(frame.encode())).await {
                            warn!("outbound send failed: {err}");
                            set_state(&writer_state, ConnectionState::Closed(err.to_string()));
                            break;
                        }
                        metrics::counter!("link_commands_sent_total").increment(1);
                    }
                    WriterMsg::Shutdown => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        let reader_state = state.clone();
        let reader = tokio::spawn(async move {
            let reason = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        handle_payload(protocol::decode(&text), &store, &events);
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        handle_payload(protocol::decode_bytes(&bytes), &store, &events);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by peer".to_string());
                    }
                    Some(Ok(_)) => {} // ping/pong handled by the protocol layer
                    Some(Err(err)) => break err.to_string(),
                    None => break "connection lost".to_string(),
                }
            };

            warn!("link closed: {reason}");
            set_state(&reader_state, ConnectionState::Closed(reason.clone()));
            // Disconnect policy: the panels must not present stale
            // vehicle state as live.
            if let Ok(mut store) = store.lock() {
                store.reset_to_defaults();
            }
            let _ = events.send(LinkEvent::Closed { reason });
        });

        Ok(Self {
            outbound,
            state,
            reader,
            writer,
        })
    }

    pub(crate) fn state(&self) -> ConnectionState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(_) => ConnectionState::Disconnected,
        }
    }

    /// Enqueue a command iff the session is open; drop it silently
    /// otherwise. Commands are inherently perishable.
    pub(crate) fn send(&self, frame: Outbound) {
        if self.state() != ConnectionState::Open {
            debug!("dropping command while link is not open");
            metrics::counter!("link_commands_dropped_total").increment(1);
            return;
        }
        if self.outbound.send(WriterMsg::Frame(frame)).is_err() {
            metrics::counter!("link_commands_dropped_total").increment(1);
        }
    }

    /// Release the session: close frame to the peer, then wait briefly
    /// for the tasks to drain.
    pub(crate) async fn close(self) {
        let _ = self.outbound.send(WriterMsg::Shutdown);
        if timeout(CLOSE_GRACE, self.writer).await.is_err() {
            debug!("writer did not stop within the close grace period");
        }
        if timeout(CLOSE_GRACE, self.reader).await.is_err() {
            debug!("reader did not stop within the close grace period");
        }
    }
}

fn set_state(state: &Arc<Mutex<ConnectionState>>, next: ConnectionState) {
    if let Ok(mut guard) = state.lock() {
        *guard = next;
    }
}

fn handle_payload(
    decoded: Result<Frame, protocol::FrameError>,
    store: &SharedStore,
    events: &mpsc::UnboundedSender<LinkEvent>,
) {
    match decoded {
        Ok(frame) => {
            metrics::counter!("link_frames_received_total").increment(1);
            apply_frame(frame, store, events);
        }
        Err(err) => {
            // A malformed frame is dropped on its own; the read loop
            // keeps the session alive.
            metrics::counter!("link_frames_malformed_total").increment(1);
            warn!("dropping malformed frame: {err}");
        }
    }
}

/// Route one decoded frame into the store. Payloads are independent
/// and demultiplexed by presence.
fn apply_frame(frame: Frame, store: &SharedStore, events: &mpsc::UnboundedSender<LinkEvent>) {
    let mut store = match store.lock() {
        Ok(guard) => guard,
        Err(_) => return,
    };

    if let Some(camera) = frame.camera {
        if let Some(image) = camera.data {
            store.set_camera_image(image);
        }
        if let Some(active) = camera.active {
            store.set_active_camera(active);
        }
        if camera.resolution.is_some() || camera.fps.is_some() {
            let current = store.camera();
            let resolution = camera
                .resolution
                .unwrap_or_else(|| current.resolution.clone());
            let fps = camera.fps.unwrap_or(current.fps);
            store.set_camera_stats(resolution, fps);
        }
    }

    if let Some(telemetry) = frame.telemetry {
        let previous_mode = store.telemetry().telemetry.flight_mode;
        let timestamp = frame.timestamp.unwrap_or(store.telemetry().timestamp);
        if store.set_telemetry(telemetry, timestamp) {
            let mode = store.telemetry().telemetry.flight_mode;
            if mode != previous_mode {
                let _ = events.send(LinkEvent::ModeChanged(mode));
            }
        }
    }

    if let Some(snapshot) = frame.data {
        store.set_map_snapshot(snapshot);
    }
}
