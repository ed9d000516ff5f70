#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use duetto::error::{ModelInferenceError, ModelLoadError, OutputError};
use duetto::gateway::OutputGateway;
use duetto::{Event, EventModel, Origin};

#[derive(Default)]
pub struct RecordingOutput {
    pub emitted: Mutex<Vec<(Origin, Event)>>,
}

impl RecordingOutput {
    pub fn positions(&self, origin: Origin) -> Vec<f64> {
        self.emitted
            .lock()
            .iter()
            .filter(|(o, _)| *o == origin)
            .map(|(_, e)| e.position)
            .collect()
    }

    pub fn count(&self, origin: Origin) -> usize {
        self.positions(origin).len()
    }
}

impl OutputGateway for RecordingOutput {
    fn emit(&self, origin: Origin, event: &Event) -> Result<(), OutputError> {
        self.emitted.lock().push((origin, *event));
        Ok(())
    }
}

pub struct FailingOutput;

impl OutputGateway for FailingOutput {
    fn emit(&self, _: Origin, _: &Event) -> Result<(), OutputError> {
        Err(OutputError::Audio)
    }
}

/// Replays scripted results in order, then repeats a fixed event.
pub struct ScriptedModel {
    pub script: VecDeque<Result<Event, ModelInferenceError>>,
    pub fallback: Event,
    pub inputs: Vec<Event>,
    pub fail_load: bool,
}

impl ScriptedModel {
    pub fn repeating(event: Event) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: event,
            inputs: Vec::new(),
            fail_load: false,
        }
    }

    pub fn calls(&self) -> usize {
        self.inputs.len()
    }
}

impl EventModel for ScriptedModel {
    fn load(&mut self) -> Result<(), ModelLoadError> {
        if self.fail_load {
            return Err(ModelLoadError::Unavailable("no weights".into()));
        }
        Ok(())
    }

    fn next(&mut self, previous: &Event) -> Result<Event, ModelInferenceError> {
        self.inputs.push(*previous);
        self.script.pop_front().unwrap_or(Ok(self.fallback))
    }
}

pub fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    done()
}
