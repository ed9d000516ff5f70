mod input;
mod log;
mod output;

pub use input::{InputGateway, connect_midi, serve_osc};
pub use log::InteractionLog;
pub use output::{Fanout, OscOutput, OutputGateway};
