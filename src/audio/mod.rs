mod output;
mod voice;

pub use output::AudioOutput;
pub use voice::{AdsrConfig, EnvelopeState, Voice};

/// Maps a position in [0,1] exponentially onto `[low_hz, high_hz]`.
pub fn position_to_freq(position: f32, low_hz: f32, high_hz: f32) -> f32 {
    let position = position.clamp(0.0, 1.0);
    low_hz * (high_hz / low_hz).powf(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_maps_to_octaves() {
        assert!((position_to_freq(0.0, 110.0, 1760.0) - 110.0).abs() < 1e-3);
        assert!((position_to_freq(0.5, 110.0, 1760.0) - 440.0).abs() < 1e-2);
        assert!((position_to_freq(1.0, 110.0, 1760.0) - 1760.0).abs() < 1e-2);
        assert!((position_to_freq(3.0, 110.0, 1760.0) - 1760.0).abs() < 1e-2);
    }
}
