pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod mode;
pub mod model;
pub mod state;
pub mod timing;

pub use config::Config;
pub use engine::{Engine, GenerationCoordinator, spawn_engine};
pub use events::{Event, Origin, RawInput};
pub use mode::{ModeController, Phase, RoutingFlags, RunMode};
pub use model::{EventModel, RandomWalkModel};
pub use state::SharedInteractionState;
