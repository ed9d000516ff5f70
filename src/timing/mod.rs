mod dispatcher;
mod queue;
mod shutdown;

pub use dispatcher::PlaybackDispatcher;
pub use queue::PlaybackQueue;
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
