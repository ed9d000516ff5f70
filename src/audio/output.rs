use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};
use tracing::{error, info};

use super::{AdsrConfig, Voice, position_to_freq};
use crate::config::AudioConfig;
use crate::error::{EngineError, OutputError};
use crate::events::{Event, Origin};
use crate::gateway::OutputGateway;
use crate::timing::Shutdown;

const MAX_VOICES: usize = 32;
const TRIGGER_CAPACITY: usize = 256;

/// Plays every emitted event as a short blip on the default output device.
pub struct AudioOutput {
    triggers: Mutex<HeapProd<f32>>,
    low_hz: f32,
    high_hz: f32,
}

impl AudioOutput {
    /// Opens the device on its own thread, which keeps the stream alive until
    /// shutdown.
    pub fn start(config: &AudioConfig, shutdown: Shutdown) -> Result<Self, EngineError> {
        let (producer, consumer) = HeapRb::<f32>::new(TRIGGER_CAPACITY).split();
        let (ready_tx, ready_rx) = crossbeam::channel::bounded(1);
        let thread_config = config.clone();

        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match build_stream(&thread_config, consumer) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    while shutdown.sleep(Duration::from_millis(250)) {}
                    drop(stream);
                    info!("audio output stopped");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        ready_rx
            .recv()
            .map_err(|_| EngineError::Audio("audio thread exited during set-up".into()))??;

        Ok(Self {
            triggers: Mutex::new(producer),
            low_hz: config.low_hz,
            high_hz: config.high_hz,
        })
    }
}

impl OutputGateway for AudioOutput {
    fn emit(&self, _origin: Origin, event: &Event) -> Result<(), OutputError> {
        let freq = position_to_freq(event.position as f32, self.low_hz, self.high_hz);
        self.triggers
            .lock()
            .try_push(freq)
            .map_err(|_| OutputError::Audio)
    }
}

struct AudioState {
    voices: Vec<Voice>,
    consumer: HeapCons<f32>,
    adsr: AdsrConfig,
    hold: f32,
    volume: f32,
    sample_rate: f32,
    num_channels: usize,
}

fn build_stream(config: &AudioConfig, consumer: HeapCons<f32>) -> Result<cpal::Stream, EngineError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| EngineError::Audio("no output device".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| EngineError::Audio(e.to_string()))?;
    let sample_rate = supported.sample_rate() as f32;
    let stream_config: cpal::StreamConfig = supported.into();
    let num_channels = stream_config.channels as usize;

    info!("audio output: {} channels, {} Hz", num_channels, sample_rate);

    let mut state = AudioState {
        voices: Vec::with_capacity(MAX_VOICES),
        consumer,
        adsr: config.adsr.clone(),
        hold: config.hold,
        volume: config.volume,
        sample_rate,
        num_channels,
    };

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                audio_callback(data, &mut state);
            },
            |err| error!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| EngineError::Audio(e.to_string()))?;

    stream
        .play()
        .map_err(|e| EngineError::Audio(e.to_string()))?;
    Ok(stream)
}

fn audio_callback(data: &mut [f32], state: &mut AudioState) {
    while let Some(freq) = state.consumer.try_pop() {
        if state.voices.len() == MAX_VOICES {
            state.voices.remove(0);
        }
        state.voices.push(Voice::new(freq, state.hold));
    }

    for frame in data.chunks_mut(state.num_channels.max(1)) {
        let mut sample = 0.0;
        for voice in &mut state.voices {
            sample += voice.render_sample(&state.adsr, state.sample_rate);
        }
        frame.fill(sample * state.volume);
    }

    let adsr = &state.adsr;
    state.voices.retain(|v| !v.is_finished(adsr));
}
