use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use rosc::{OscMessage, OscPacket, OscType};

use crate::error::OutputError;
use crate::events::{Event, Origin};

/// Renders an event somewhere audible or observable.
pub trait OutputGateway: Send + Sync {
    fn emit(&self, origin: Origin, event: &Event) -> Result<(), OutputError>;
}

/// Sends `<address> [position, origin]` to a sound engine over UDP.
pub struct OscOutput {
    socket: UdpSocket,
    target: SocketAddr,
    address: String,
}

impl OscOutput {
    pub fn connect(target: &str, address: &str) -> Result<Self, OutputError> {
        let target = target.to_socket_addrs()?.next().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("no address for {target}"),
            )
        })?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        Ok(Self {
            socket,
            target,
            address: address.to_string(),
        })
    }
}

impl OutputGateway for OscOutput {
    fn emit(&self, origin: Origin, event: &Event) -> Result<(), OutputError> {
        let packet = OscPacket::Message(OscMessage {
            addr: self.address.clone(),
            args: vec![
                OscType::Float(event.position as f32),
                OscType::String(origin.as_str().to_string()),
            ],
        });
        let buf = rosc::encoder::encode(&packet)?;
        self.socket.send_to(&buf, self.target)?;
        Ok(())
    }
}

/// Delivers to every output in turn. A failing output does not stop the rest;
/// the first failure is returned once all were tried.
#[derive(Default)]
pub struct Fanout {
    outputs: Vec<Arc<dyn OutputGateway>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, output: Arc<dyn OutputGateway>) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl OutputGateway for Fanout {
    fn emit(&self, origin: Origin, event: &Event) -> Result<(), OutputError> {
        let mut first_err = None;
        for output in &self.outputs {
            if let Err(e) = output.emit(origin, event) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
