use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsrConfig {
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub decay: f32,
    /// 0.0 -> 1.0
    pub sustain: f32,
    /// Seconds
    pub release: f32,
}

impl Default for AdsrConfig {
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.05,
            sustain: 0.6,
            release: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeState {
    Attack { time: f32 },
    Decay { time: f32 },
    Sustain,
    Release { time: f32 },
}

/// A sine blip: held for a fixed time, then released.
#[derive(Debug, Clone)]
pub struct Voice {
    freq: f32,
    phase: f32,
    hold: f32,
    envelope_state: EnvelopeState,
    envelope_level: f32,
    release_from: f32,
}

impl Voice {
    pub fn new(freq: f32, hold: f32) -> Self {
        Self {
            freq,
            phase: 0.0,
            hold: hold.max(0.0),
            envelope_state: EnvelopeState::Attack { time: 0.0 },
            envelope_level: 0.0,
            release_from: 0.0,
        }
    }

    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope_state
    }

    pub fn is_finished(&self, adsr: &AdsrConfig) -> bool {
        matches!(self.envelope_state, EnvelopeState::Release { time } if time >= adsr.release)
    }

    pub fn render_sample(&mut self, adsr: &AdsrConfig, sample_rate: f32) -> f32 {
        let sample = (self.phase * std::f32::consts::TAU).sin() * self.envelope_level;

        self.phase += self.freq / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.advance(adsr, 1.0 / sample_rate);
        sample
    }

    fn advance(&mut self, adsr: &AdsrConfig, dt: f32) {
        self.hold -= dt;
        if self.hold <= 0.0 && !matches!(self.envelope_state, EnvelopeState::Release { .. }) {
            self.envelope_state = EnvelopeState::Release { time: 0.0 };
            self.release_from = self.envelope_level;
        }

        match &mut self.envelope_state {
            EnvelopeState::Attack { time } => {
                *time += dt;
                if *time >= adsr.attack {
                    self.envelope_state = EnvelopeState::Decay { time: 0.0 };
                    self.envelope_level = 1.0;
                } else {
                    self.envelope_level = *time / adsr.attack;
                }
            }
            EnvelopeState::Decay { time } => {
                *time += dt;
                if *time >= adsr.decay {
                    self.envelope_state = EnvelopeState::Sustain;
                    self.envelope_level = adsr.sustain;
                } else {
                    self.envelope_level = 1.0 - (1.0 - adsr.sustain) * (*time / adsr.decay);
                }
            }
            EnvelopeState::Sustain => {
                self.envelope_level = adsr.sustain;
            }
            EnvelopeState::Release { time } => {
                *time += dt;
                let progress = if adsr.release == 0.0 {
                    1.0
                } else {
                    (*time / adsr.release).min(1.0)
                };
                self.envelope_level = self.release_from * (1.0 - progress);
            }
        }
    }
}
