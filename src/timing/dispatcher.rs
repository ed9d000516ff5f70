use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{PlaybackQueue, Shutdown};
use crate::config::DEFAULT_MIN_PLAYBACK_DELAY;
use crate::events::{Event, Origin};
use crate::gateway::OutputGateway;
use crate::state::SharedInteractionState;

/// Releases queued model events at their modeled spacing.
pub struct PlaybackDispatcher {
    state: Arc<SharedInteractionState>,
    queue: PlaybackQueue,
    output: Arc<dyn OutputGateway>,
    min_delay: f64,
}

impl PlaybackDispatcher {
    pub fn new(
        state: Arc<SharedInteractionState>,
        queue: PlaybackQueue,
        output: Arc<dyn OutputGateway>,
        min_delay: f64,
    ) -> Self {
        let min_delay = if min_delay.is_finite() && min_delay > 0.0 {
            min_delay
        } else {
            warn!(min_delay, "minimum playback delay must be positive, using default");
            DEFAULT_MIN_PLAYBACK_DELAY
        };
        Self {
            state,
            queue,
            output,
            min_delay,
        }
    }

    /// Runs until shutdown. An event popped but still sleeping when shutdown
    /// fires is dropped.
    pub fn run(&self, shutdown: &Shutdown) {
        while let Some(event) = self.queue.pop(shutdown) {
            if !self.play(event, shutdown) {
                break;
            }
        }
        info!("playback dispatcher stopped");
    }

    /// Waits out the event's delay, then records and (if routed) emits it.
    /// Returns `false` if shutdown interrupted the wait.
    pub fn play(&self, event: Event, shutdown: &Shutdown) -> bool {
        let event = event.clamped(self.min_delay);
        let wait = Duration::try_from_secs_f64(event.delay).unwrap_or_else(|_| {
            warn!(delay = event.delay, "unusable playback delay, using minimum");
            Duration::from_secs_f64(self.min_delay)
        });
        if !shutdown.sleep(wait) {
            return false;
        }

        let event = Event::new(wait.as_secs_f64(), event.position);
        self.state.set_last_model_event(event);

        if self.state.routing().model_drives_output {
            match self.output.emit(Origin::Model, &event) {
                Ok(()) => debug!(position = event.position, delay = event.delay, "model played"),
                Err(e) => warn!("model event delivery failed: {}", e),
            }
        }
        true
    }
}
