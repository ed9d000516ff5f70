use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::RwLock;

use crate::events::Event;
use crate::mode::{Phase, RoutingFlags};

#[derive(Debug, Clone, Copy)]
pub struct HumanSnapshot {
    pub event: Event,
    pub at: Instant,
}

/// Interaction state shared by the input, generation and playback threads.
///
/// Each field group sits behind its own lock so readers never see a value
/// half-written by another thread. Writers: the input gateway owns the human
/// group, the playback dispatcher owns the model event, the mode controller
/// owns routing flags and phase.
pub struct SharedInteractionState {
    human: RwLock<HumanSnapshot>,
    model: RwLock<Event>,
    routing: ArcSwap<RoutingFlags>,
    phase: RwLock<Phase>,
}

impl SharedInteractionState {
    pub fn new(human_seed: Event, model_seed: Event, routing: RoutingFlags) -> Self {
        Self {
            human: RwLock::new(HumanSnapshot {
                event: human_seed,
                at: Instant::now(),
            }),
            model: RwLock::new(model_seed),
            routing: ArcSwap::from_pointee(routing),
            phase: RwLock::new(Phase::Call),
        }
    }

    pub fn last_human(&self) -> HumanSnapshot {
        *self.human.read()
    }

    pub fn last_human_event(&self) -> Event {
        self.human.read().event
    }

    pub fn last_human_interaction(&self) -> Instant {
        self.human.read().at
    }

    /// Stores a human event stamped `at`, deriving its delay from the previous
    /// interaction. Returns the stored event.
    ///
    /// The interaction time never moves backwards: a stamp older than the
    /// stored one, from input threads racing to the lock, keeps the newer time.
    pub fn record_human_at(&self, position: f64, at: Instant) -> Event {
        let mut human = self.human.write();
        let delay = at
            .checked_duration_since(human.at)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        let event = Event::new(delay, position);
        *human = HumanSnapshot {
            event,
            at: at.max(human.at),
        };
        event
    }

    pub fn last_model_event(&self) -> Event {
        *self.model.read()
    }

    pub fn set_last_model_event(&self, event: Event) {
        *self.model.write() = event;
    }

    pub fn routing(&self) -> RoutingFlags {
        **self.routing.load()
    }

    pub fn set_routing(&self, flags: RoutingFlags) {
        self.routing.store(std::sync::Arc::new(flags));
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    pub fn set_phase(&self, phase: Phase) {
        *self.phase.write() = phase;
    }
}
