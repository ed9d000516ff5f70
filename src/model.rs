use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ModelConfig;
use crate::error::{ModelInferenceError, ModelLoadError};
use crate::events::Event;

/// A generative sequence model: given the most recent event, produce the next.
///
/// `load` is called once before the first `next`. Implementations may keep
/// internal state between calls.
pub trait EventModel: Send {
    fn load(&mut self) -> Result<(), ModelLoadError>;

    fn next(&mut self, previous: &Event) -> Result<Event, ModelInferenceError>;
}

impl<M: EventModel + ?Sized> EventModel for Box<M> {
    fn load(&mut self) -> Result<(), ModelLoadError> {
        (**self).load()
    }

    fn next(&mut self, previous: &Event) -> Result<Event, ModelInferenceError> {
        (**self).next(previous)
    }
}

/// Bounded random walk over position with delays scattered around a mean,
/// pulled halfway toward the previous event's delay.
pub struct RandomWalkModel {
    params: ModelConfig,
    rng: StdRng,
    loaded: bool,
}

impl RandomWalkModel {
    pub fn new(params: ModelConfig) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            params,
            rng,
            loaded: false,
        }
    }
}

impl EventModel for RandomWalkModel {
    fn load(&mut self) -> Result<(), ModelLoadError> {
        let p = &self.params;
        if !(p.step.is_finite() && (0.0..=1.0).contains(&p.step)) {
            return Err(ModelLoadError::InvalidParameter {
                name: "step",
                value: p.step,
            });
        }
        if !(p.mean_delay_secs.is_finite() && p.mean_delay_secs > 0.0) {
            return Err(ModelLoadError::InvalidParameter {
                name: "mean_delay_secs",
                value: p.mean_delay_secs,
            });
        }
        if !(p.delay_jitter.is_finite() && (0.0..=1.0).contains(&p.delay_jitter)) {
            return Err(ModelLoadError::InvalidParameter {
                name: "delay_jitter",
                value: p.delay_jitter,
            });
        }
        self.loaded = true;
        Ok(())
    }

    fn next(&mut self, previous: &Event) -> Result<Event, ModelInferenceError> {
        if !self.loaded {
            return Err(ModelInferenceError::NotLoaded);
        }
        if !previous.is_finite() {
            return Err(ModelInferenceError::NonFinite {
                delay: previous.delay,
                position: previous.position,
            });
        }

        let p = &self.params;
        let step = if p.step > 0.0 {
            self.rng.gen_range(-p.step..=p.step)
        } else {
            0.0
        };
        let mut position = previous.position.clamp(0.0, 1.0) + step;
        // Reflect off the edges instead of sticking to them.
        if position > 1.0 {
            position = 2.0 - position;
        } else if position < 0.0 {
            position = -position;
        }

        let anchor = 0.5 * (p.mean_delay_secs + previous.delay.clamp(0.0, 4.0 * p.mean_delay_secs));
        let spread = if p.delay_jitter > 0.0 {
            self.rng.gen_range(-p.delay_jitter..=p.delay_jitter)
        } else {
            0.0
        };
        let delay = (anchor * (1.0 + spread)).max(0.0);

        Ok(Event::new(delay, position.clamp(0.0, 1.0)))
    }
}
