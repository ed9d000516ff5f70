use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::AdsrConfig;
use crate::error::ConfigError;
use crate::mode::RunMode;

pub const DEFAULT_MIN_PLAYBACK_DELAY: f64 = 0.001;
pub const DEFAULT_CALL_RESPONSE_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run_mode: RunMode,
    #[serde(default = "Config::default_call_response_threshold_secs")]
    pub call_response_threshold_secs: f64,
    #[serde(default = "Config::default_min_playback_delay_secs")]
    pub min_playback_delay_secs: f64,
    #[serde(default = "Config::default_idle_yield_ms")]
    pub idle_yield_ms: u64,
    #[serde(default = "Config::default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    #[serde(default)]
    pub osc: OscConfig,
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    fn default_call_response_threshold_secs() -> f64 {
        DEFAULT_CALL_RESPONSE_THRESHOLD
    }
    fn default_min_playback_delay_secs() -> f64 {
        DEFAULT_MIN_PLAYBACK_DELAY
    }
    fn default_idle_yield_ms() -> u64 {
        1
    }
    fn default_shutdown_grace_ms() -> u64 {
        1000
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ron_string = fs::read_to_string(path)?;
        Ok(ron::from_str(&ron_string)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    pub fn call_response_threshold(&self) -> Duration {
        Duration::try_from_secs_f64(self.call_response_threshold_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_CALL_RESPONSE_THRESHOLD))
    }

    pub fn idle_yield(&self) -> Duration {
        Duration::from_millis(self.idle_yield_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            call_response_threshold_secs: Self::default_call_response_threshold_secs(),
            min_playback_delay_secs: Self::default_min_playback_delay_secs(),
            idle_yield_ms: Self::default_idle_yield_ms(),
            shutdown_grace_ms: Self::default_shutdown_grace_ms(),
            osc: OscConfig::default(),
            midi: MidiConfig::default(),
            audio: AudioConfig::default(),
            model: ModelConfig::default(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscConfig {
    #[serde(default = "OscConfig::default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "OscConfig::default_target_addr")]
    pub target_addr: String,
    #[serde(default = "OscConfig::default_input_address")]
    pub input_address: String,
    #[serde(default = "OscConfig::default_output_address")]
    pub output_address: String,
}

impl OscConfig {
    fn default_listen_addr() -> String {
        "127.0.0.1:5001".to_string()
    }
    fn default_target_addr() -> String {
        "127.0.0.1:5000".to_string()
    }
    fn default_input_address() -> String {
        "/interface".to_string()
    }
    fn default_output_address() -> String {
        "/prediction".to_string()
    }
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            target_addr: Self::default_target_addr(),
            input_address: Self::default_input_address(),
            output_address: Self::default_output_address(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MidiConfig {
    /// Substring of the input port name; `None` disables MIDI input.
    #[serde(default)]
    pub port_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub adsr: AdsrConfig,
    /// Seconds a blip is held before release.
    #[serde(default = "AudioConfig::default_hold")]
    pub hold: f32,
    #[serde(default = "AudioConfig::default_volume")]
    pub volume: f32,
    #[serde(default = "AudioConfig::default_low_hz")]
    pub low_hz: f32,
    #[serde(default = "AudioConfig::default_high_hz")]
    pub high_hz: f32,
}

impl AudioConfig {
    fn default_hold() -> f32 {
        0.05
    }
    fn default_volume() -> f32 {
        0.3
    }
    fn default_low_hz() -> f32 {
        110.0
    }
    fn default_high_hz() -> f32 {
        1760.0
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            adsr: AdsrConfig::default(),
            hold: Self::default_hold(),
            volume: Self::default_volume(),
            low_hz: Self::default_low_hz(),
            high_hz: Self::default_high_hz(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    /// Largest position change per generated event.
    #[serde(default = "ModelConfig::default_step")]
    pub step: f64,
    #[serde(default = "ModelConfig::default_mean_delay_secs")]
    pub mean_delay_secs: f64,
    /// Relative spread of generated delays around the mean, in [0,1].
    #[serde(default = "ModelConfig::default_delay_jitter")]
    pub delay_jitter: f64,
}

impl ModelConfig {
    fn default_step() -> f64 {
        0.1
    }
    fn default_mean_delay_secs() -> f64 {
        0.25
    }
    fn default_delay_jitter() -> f64 {
        0.5
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed: None,
            step: Self::default_step(),
            mean_delay_secs: Self::default_mean_delay_secs(),
            delay_jitter: Self::default_delay_jitter(),
        }
    }
}
