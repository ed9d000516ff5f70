use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// One gesture: seconds since the previous gesture of the same origin, and a
/// normalized position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub delay: f64,
    pub position: f64,
}

impl Event {
    pub fn new(delay: f64, position: f64) -> Self {
        Self { delay, position }
    }

    /// Uniform seed sample used before any real event exists.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            delay: rng.gen_range(0.0..1.0),
            position: rng.gen_range(0.0..=1.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.delay.is_finite() && self.position.is_finite()
    }

    /// Position in [0,1], delay at least `min_delay`.
    pub fn clamped(&self, min_delay: f64) -> Self {
        Self {
            delay: self.delay.max(min_delay),
            position: self.position.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Human,
    Model,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Human => "user",
            Origin::Model => "rnn",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undecoded human input as it arrives from a transport.
#[derive(Debug, Clone)]
pub enum RawInput {
    Osc(rosc::OscMessage),
    Midi(Vec<u8>),
}

impl RawInput {
    /// Extracts a position in [0,1], or reports why the payload is unusable.
    pub fn position(&self, osc_address: &str) -> Result<f64, InputError> {
        let position = match self {
            RawInput::Osc(msg) => {
                if msg.addr != osc_address {
                    return Err(InputError::UnexpectedAddress(msg.addr.clone()));
                }
                msg.args
                    .iter()
                    .find_map(osc_number)
                    .ok_or(InputError::MissingPosition)?
            }
            RawInput::Midi(bytes) => midi_note_position(bytes)?,
        };

        if !position.is_finite() {
            return Err(InputError::NonFinite);
        }
        Ok(position.clamp(0.0, 1.0))
    }
}

fn osc_number(arg: &rosc::OscType) -> Option<f64> {
    match arg {
        rosc::OscType::Float(v) => Some(*v as f64),
        rosc::OscType::Double(v) => Some(*v),
        rosc::OscType::Int(v) => Some(*v as f64),
        rosc::OscType::Long(v) => Some(*v as f64),
        _ => None,
    }
}

fn midi_note_position(msg: &[u8]) -> Result<f64, InputError> {
    match msg {
        [status, note, velocity, ..] if status & 0xF0 == 0x90 && *velocity > 0 => {
            Ok(*note as f64 / 127.0)
        }
        [status, ..] => Err(InputError::UnsupportedMidi(*status)),
        [] => Err(InputError::MissingPosition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscMessage, OscType};

    fn osc(addr: &str, args: Vec<OscType>) -> RawInput {
        RawInput::Osc(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    #[test]
    fn clamps_position_and_delay() {
        let e = Event::new(-5.0, 1.7).clamped(0.001);
        assert_eq!(e.delay, 0.001);
        assert_eq!(e.position, 1.0);

        let e = Event::new(0.2, -0.3).clamped(0.001);
        assert_eq!(e.delay, 0.2);
        assert_eq!(e.position, 0.0);
    }

    #[test]
    fn osc_position_takes_first_number() {
        let raw = osc(
            "/interface",
            vec![OscType::String("x".into()), OscType::Float(0.25)],
        );
        assert_eq!(raw.position("/interface").unwrap(), 0.25);

        let raw = osc("/interface", vec![OscType::Int(3)]);
        assert_eq!(raw.position("/interface").unwrap(), 1.0);
    }

    #[test]
    fn osc_rejects_wrong_address_and_missing_args() {
        let raw = osc("/other", vec![OscType::Float(0.5)]);
        assert!(matches!(
            raw.position("/interface"),
            Err(InputError::UnexpectedAddress(_))
        ));

        let raw = osc("/interface", vec![]);
        assert!(matches!(
            raw.position("/interface"),
            Err(InputError::MissingPosition)
        ));

        let raw = osc("/interface", vec![OscType::Double(f64::NAN)]);
        assert!(matches!(
            raw.position("/interface"),
            Err(InputError::NonFinite)
        ));
    }

    #[test]
    fn midi_note_on_maps_pitch() {
        let raw = RawInput::Midi(vec![0x91, 127, 100]);
        assert_eq!(raw.position("/interface").unwrap(), 1.0);

        let raw = RawInput::Midi(vec![0x90, 64, 0]);
        assert!(matches!(
            raw.position("/interface"),
            Err(InputError::UnsupportedMidi(0x90))
        ));

        let raw = RawInput::Midi(vec![0xB0, 1, 2]);
        assert!(raw.position("/interface").is_err());
    }
}
