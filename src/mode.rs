use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::state::SharedInteractionState;
use crate::timing::PlaybackQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    #[default]
    UserOnly,
    ModelOnly,
    CallResponse,
    Polyphony,
    Battle,
}

impl RunMode {
    pub fn initial_routing(&self) -> RoutingFlags {
        match self {
            RunMode::UserOnly => RoutingFlags::default(),
            RunMode::ModelOnly | RunMode::Battle => RoutingFlags::AUTONOMOUS,
            RunMode::CallResponse => Phase::Call.routing(),
            RunMode::Polyphony => RoutingFlags {
                human_drives_model: true,
                model_drives_model: false,
                model_drives_output: true,
            },
        }
    }

    /// Whether human input is sent to the output alongside the model.
    pub fn hears_human_directly(&self) -> bool {
        !matches!(self, RunMode::ModelOnly)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunMode::UserOnly => "user only",
            RunMode::ModelOnly => "model only",
            RunMode::CallResponse => "call and response",
            RunMode::Polyphony => "polyphony",
            RunMode::Battle => "battle",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingFlags {
    pub human_drives_model: bool,
    pub model_drives_model: bool,
    pub model_drives_output: bool,
}

impl RoutingFlags {
    pub const AUTONOMOUS: RoutingFlags = RoutingFlags {
        human_drives_model: false,
        model_drives_model: true,
        model_drives_output: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Call,
    Response,
}

impl Phase {
    pub fn routing(&self) -> RoutingFlags {
        match self {
            Phase::Call => RoutingFlags {
                human_drives_model: true,
                model_drives_model: false,
                model_drives_output: false,
            },
            Phase::Response => RoutingFlags::AUTONOMOUS,
        }
    }

    /// Next phase given whether the human has been silent past the threshold.
    pub fn next(&self, silent: bool) -> Option<Phase> {
        match (self, silent) {
            (Phase::Call, true) => Some(Phase::Response),
            (Phase::Response, false) => Some(Phase::Call),
            (Phase::Call, false) | (Phase::Response, true) => None,
        }
    }
}

/// Hands the floor between human and model in call-and-response mode.
pub struct ModeController {
    state: Arc<SharedInteractionState>,
    queue: PlaybackQueue,
    threshold: Duration,
    active: bool,
}

impl ModeController {
    pub fn new(
        run_mode: RunMode,
        state: Arc<SharedInteractionState>,
        queue: PlaybackQueue,
        threshold: Duration,
    ) -> Self {
        Self {
            state,
            queue,
            threshold,
            active: run_mode == RunMode::CallResponse,
        }
    }

    pub fn check(&self) -> Option<Phase> {
        self.check_at(Instant::now())
    }

    /// Applies at most one phase transition as of `now` and returns the new
    /// phase if one happened.
    pub fn check_at(&self, now: Instant) -> Option<Phase> {
        if !self.active {
            return None;
        }

        let since_human = now.saturating_duration_since(self.state.last_human_interaction());
        let current = self.state.phase();
        let next = current.next(since_human > self.threshold)?;

        // Flags go first; the drain's new epoch turns away ticks that read the old ones.
        self.state.set_routing(next.routing());
        self.state.set_phase(next);

        match next {
            Phase::Response => info!("switching to response"),
            Phase::Call => {
                info!("switching to call");
                let cleared = self.queue.drain();
                debug!(cleared, "cleared stale model output");
            }
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

    #[test]
    fn transition_table() {
        assert_eq!(Phase::Call.next(true), Some(Phase::Response));
        assert_eq!(Phase::Call.next(false), None);
        assert_eq!(Phase::Response.next(false), Some(Phase::Call));
        assert_eq!(Phase::Response.next(true), None);
    }

    #[test]
    fn initial_routing_per_mode() {
        let off = RoutingFlags::default();
        assert_eq!(RunMode::UserOnly.initial_routing(), off);
        assert_eq!(RunMode::ModelOnly.initial_routing(), RoutingFlags::AUTONOMOUS);
        assert_eq!(RunMode::Battle.initial_routing(), RoutingFlags::AUTONOMOUS);
        assert_eq!(
            RunMode::CallResponse.initial_routing(),
            RoutingFlags {
                human_drives_model: true,
                model_drives_model: false,
                model_drives_output: false,
            }
        );
        assert_eq!(
            RunMode::Polyphony.initial_routing(),
            RoutingFlags {
                human_drives_model: true,
                model_drives_model: false,
                model_drives_output: true,
            }
        );
        assert!(!RunMode::ModelOnly.hears_human_directly());
        assert!(RunMode::Battle.hears_human_directly());
    }

    #[test]
    fn inactive_outside_call_response() {
        let state = Arc::new(SharedInteractionState::new(
            Event::new(0.1, 0.1),
            Event::new(0.1, 0.1),
            RunMode::Polyphony.initial_routing(),
        ));
        let controller = ModeController::new(
            RunMode::Polyphony,
            state.clone(),
            PlaybackQueue::new(),
            Duration::from_secs(2),
        );
        let later = state.last_human_interaction() + Duration::from_secs(60);
        assert_eq!(controller.check_at(later), None);
        assert_eq!(state.routing(), RunMode::Polyphony.initial_routing());
    }
}
