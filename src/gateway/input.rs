use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::{Duration, Instant};

use midir::{MidiInput, MidiInputConnection};
use rosc::OscPacket;
use tracing::{debug, info, warn};

use super::OutputGateway;
use crate::error::EngineError;
use crate::events::{Event, Origin, RawInput};
use crate::state::SharedInteractionState;
use crate::timing::Shutdown;

const OSC_POLL: Duration = Duration::from_millis(50);

/// Turns raw human input into events and publishes them as the last human
/// event. Optionally forwards them straight to the output.
///
/// `log` sees every accepted human event, including in modes where the
/// performer is not sent to the output.
pub struct InputGateway {
    state: Arc<SharedInteractionState>,
    direct: Option<Arc<dyn OutputGateway>>,
    log: Option<Arc<dyn OutputGateway>>,
    osc_address: String,
}

impl InputGateway {
    pub fn new(
        state: Arc<SharedInteractionState>,
        direct: Option<Arc<dyn OutputGateway>>,
        log: Option<Arc<dyn OutputGateway>>,
        osc_address: &str,
    ) -> Self {
        Self {
            state,
            direct,
            log,
            osc_address: osc_address.to_string(),
        }
    }

    pub fn on_human_input(&self, raw: &RawInput) -> Option<Event> {
        self.on_human_input_at(raw, Instant::now())
    }

    /// Malformed input is logged and leaves the state untouched.
    pub fn on_human_input_at(&self, raw: &RawInput, at: Instant) -> Option<Event> {
        let position = match raw.position(&self.osc_address) {
            Ok(position) => position,
            Err(e) => {
                warn!("discarding human input: {}", e);
                return None;
            }
        };

        let event = self.state.record_human_at(position, at);
        debug!(position = event.position, delay = event.delay, "human input");

        if let Some(output) = &self.direct {
            if let Err(e) = output.emit(Origin::Human, &event) {
                warn!("human event delivery failed: {}", e);
            }
        }
        if let Some(log) = &self.log {
            if let Err(e) = log.emit(Origin::Human, &event) {
                warn!("could not log human event: {}", e);
            }
        }
        Some(event)
    }

    pub fn osc_address(&self) -> &str {
        &self.osc_address
    }

    fn handle_packet(&self, packet: OscPacket) {
        match packet {
            OscPacket::Message(msg) => {
                if msg.addr == self.osc_address {
                    self.on_human_input(&RawInput::Osc(msg));
                } else {
                    debug!(addr = %msg.addr, "ignoring OSC message");
                }
            }
            OscPacket::Bundle(bundle) => {
                for packet in bundle.content {
                    self.handle_packet(packet);
                }
            }
        }
    }
}

/// Serves OSC input on `socket` until shutdown.
pub fn serve_osc(socket: UdpSocket, gateway: Arc<InputGateway>, shutdown: Shutdown) {
    if let Err(e) = socket.set_read_timeout(Some(OSC_POLL)) {
        warn!("could not set OSC read timeout: {}", e);
    }
    let mut buf = [0u8; rosc::decoder::MTU];

    while !shutdown.is_requested() {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => match rosc::decoder::decode_udp(&buf[..len]) {
                Ok((_, packet)) => gateway.handle_packet(packet),
                Err(e) => warn!(%from, "undecodable OSC packet: {}", e),
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                warn!("OSC receive failed: {}", e);
                shutdown.sleep(OSC_POLL);
            }
        }
    }
    info!("OSC input stopped");
}

/// Listens on the first MIDI input whose name contains `port_name`.
pub fn connect_midi(
    port_name: &str,
    gateway: Arc<InputGateway>,
) -> Result<MidiInputConnection<()>, EngineError> {
    let midi_in = MidiInput::new("duetto").map_err(|e| EngineError::Midi(e.to_string()))?;

    let ports = midi_in.ports();
    let port = ports
        .iter()
        .find(|p| {
            midi_in
                .port_name(p)
                .unwrap_or_default()
                .contains(port_name)
        })
        .ok_or_else(|| EngineError::Midi(format!("no MIDI input matching `{port_name}`")))?;
    let name = midi_in.port_name(port).unwrap_or_default();

    let conn = midi_in
        .connect(
            port,
            "duetto-input",
            move |_timestamp, message, _| {
                // Note-offs and controller traffic are expected; only note-ons carry a position.
                if message.first().is_some_and(|s| s & 0xF0 == 0x90) {
                    gateway.on_human_input(&RawInput::Midi(message.to_vec()));
                }
            },
            (),
        )
        .map_err(|e| EngineError::Midi(e.to_string()))?;

    info!("listening for MIDI on {}", name);
    Ok(conn)
}
