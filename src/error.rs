use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("invalid model parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ModelInferenceError {
    #[error("model was used before it was loaded")]
    NotLoaded,
    #[error("model produced a non-finite event (delay={delay}, position={position})")]
    NonFinite { delay: f64, position: f64 },
    #[error("inference failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("unexpected input address `{0}`")]
    UnexpectedAddress(String),
    #[error("input carries no position value")]
    MissingPosition,
    #[error("input position is not finite")]
    NonFinite,
    #[error("unsupported MIDI status byte {0:#04x}")]
    UnsupportedMidi(u8),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("OSC encoding failed: {0}")]
    Encode(#[from] rosc::OscError),
    #[error("audio output is full or closed")]
    Audio,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse failed: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("config serialization failed: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model failed to load: {0}")]
    ModelLoad(#[from] ModelLoadError),
    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("MIDI input failed: {0}")]
    Midi(String),
    #[error("audio output failed: {0}")]
    Audio(String),
    #[error("interaction log unavailable: {0}")]
    Log(#[from] OutputError),
}
