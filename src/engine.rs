use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender};
use midir::MidiInputConnection;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::events::Event;
use crate::gateway::{Fanout, InputGateway, InteractionLog, OutputGateway, connect_midi, serve_osc};
use crate::mode::{ModeController, RunMode};
use crate::model::EventModel;
use crate::state::SharedInteractionState;
use crate::timing::{PlaybackDispatcher, PlaybackQueue, Shutdown, ShutdownTrigger};

/// Decides each tick whether to run the model and where its output goes.
pub struct GenerationCoordinator<M: EventModel> {
    model: M,
    state: Arc<SharedInteractionState>,
    queue: PlaybackQueue,
}

impl<M: EventModel> GenerationCoordinator<M> {
    /// `model` must already be loaded.
    pub fn new(model: M, state: Arc<SharedInteractionState>, queue: PlaybackQueue) -> Self {
        Self {
            model,
            state,
            queue,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Runs one generation step and returns whether the model was called.
    ///
    /// While the human drives the model, every tick conditions on the last
    /// human event, whether or not it changed since the previous tick.
    pub fn tick(&mut self) -> bool {
        // Epoch before flags: a flush that lands in between turns the push away.
        let epoch = self.queue.epoch();
        let routing = self.state.routing();

        if routing.human_drives_model {
            let human = self.state.last_human_event();
            let Some(output) = self.infer(&human) else {
                return false;
            };
            if routing.model_drives_output && !self.queue.push_in(epoch, output) {
                debug!("response dropped by a flush");
            }
            true
        } else if routing.model_drives_model && self.queue.is_empty() {
            let previous = self.state.last_model_event();
            let Some(output) = self.infer(&previous) else {
                return false;
            };
            debug!(position = output.position, delay = output.delay, "model continued itself");
            if !self.queue.push_in(epoch, output) {
                debug!("continuation dropped by a flush");
            }
            true
        } else {
            false
        }
    }

    fn infer(&mut self, input: &Event) -> Option<Event> {
        match self.model.next(input) {
            Ok(event) if event.is_finite() => Some(event),
            Ok(event) => {
                warn!(
                    delay = event.delay,
                    position = event.position,
                    "model produced a non-finite event"
                );
                None
            }
            Err(e) => {
                warn!("model inference failed: {}", e);
                None
            }
        }
    }
}

/// The running interaction: coordinator and mode checks on the caller's
/// thread, playback and OSC input on their own.
pub struct Engine<M: EventModel> {
    run_mode: RunMode,
    idle_yield: Duration,
    shutdown_grace: Duration,
    state: Arc<SharedInteractionState>,
    queue: PlaybackQueue,
    coordinator: GenerationCoordinator<M>,
    mode: ModeController,
    input: Arc<InputGateway>,
    osc_addr: SocketAddr,
    trigger: ShutdownTrigger,
    shutdown: Shutdown,
    workers: Vec<&'static str>,
    done_rx: Receiver<&'static str>,
    _midi: Option<MidiInputConnection<()>>,
}

/// Loads the model, seeds shared state and starts the worker threads.
///
/// When `config.log_file` is set, the interaction log records every human
/// event as it arrives and every model event as it is played, whatever the
/// run mode.
pub fn spawn_engine<M: EventModel>(
    config: &Config,
    mut model: M,
    output: Arc<dyn OutputGateway>,
    trigger: ShutdownTrigger,
    shutdown: Shutdown,
) -> Result<Engine<M>, EngineError> {
    model.load()?;
    info!("model loaded");

    let run_mode = config.run_mode;
    info!("entering {} mode", run_mode);

    let mut rng = rand::thread_rng();
    let state = Arc::new(SharedInteractionState::new(
        Event::random(&mut rng),
        Event::random(&mut rng),
        run_mode.initial_routing(),
    ));
    let queue = PlaybackQueue::new();

    let log: Option<Arc<dyn OutputGateway>> = match &config.log_file {
        Some(path) => {
            info!("logging interaction to {}", path.display());
            Some(Arc::new(InteractionLog::open(path)?))
        }
        None => None,
    };

    let direct = run_mode.hears_human_directly().then(|| output.clone());
    let input = Arc::new(InputGateway::new(
        state.clone(),
        direct,
        log.clone(),
        &config.osc.input_address,
    ));
    let played: Arc<dyn OutputGateway> = match log {
        Some(log) => Arc::new(Fanout::new().with(output).with(log)),
        None => output,
    };

    let socket = UdpSocket::bind(&config.osc.listen_addr)?;
    let osc_addr = socket.local_addr()?;
    info!("serving OSC on {}", osc_addr);

    let midi = match &config.midi.port_name {
        Some(name) => Some(connect_midi(name, input.clone())?),
        None => None,
    };

    let (done_tx, done_rx) = crossbeam::channel::unbounded();
    let mut workers = Vec::new();

    let dispatcher = PlaybackDispatcher::new(
        state.clone(),
        queue.clone(),
        played,
        config.min_playback_delay_secs,
    );
    let playback_shutdown = shutdown.clone();
    spawn_worker("playback", &done_tx, &mut workers, move || {
        dispatcher.run(&playback_shutdown)
    })?;

    let osc_input = input.clone();
    let osc_shutdown = shutdown.clone();
    spawn_worker("osc-input", &done_tx, &mut workers, move || {
        serve_osc(socket, osc_input, osc_shutdown)
    })?;

    let mode = ModeController::new(
        run_mode,
        state.clone(),
        queue.clone(),
        config.call_response_threshold(),
    );
    let coordinator = GenerationCoordinator::new(model, state.clone(), queue.clone());

    Ok(Engine {
        run_mode,
        idle_yield: config.idle_yield(),
        shutdown_grace: config.shutdown_grace(),
        state,
        queue,
        coordinator,
        mode,
        input,
        osc_addr,
        trigger,
        shutdown,
        workers,
        done_rx,
        _midi: midi,
    })
}

fn spawn_worker<F>(
    name: &'static str,
    done_tx: &Sender<&'static str>,
    workers: &mut Vec<&'static str>,
    f: F,
) -> Result<(), EngineError>
where
    F: FnOnce() + Send + 'static,
{
    let done_tx = done_tx.clone();
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            f();
            let _ = done_tx.send(name);
        })?;
    workers.push(name);
    Ok(())
}

impl<M: EventModel> Engine<M> {
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn state(&self) -> &Arc<SharedInteractionState> {
        &self.state
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn input(&self) -> &Arc<InputGateway> {
        &self.input
    }

    pub fn coordinator(&self) -> &GenerationCoordinator<M> {
        &self.coordinator
    }

    pub fn osc_addr(&self) -> SocketAddr {
        self.osc_addr
    }

    /// One coordinator tick followed by a mode check. Returns whether either
    /// did any work.
    pub fn step(&mut self) -> bool {
        let worked = self.coordinator.tick();
        let switched = self.mode.check().is_some();
        worked || switched
    }

    /// Runs until shutdown fires.
    pub fn run(&mut self) {
        info!("now running");
        while !self.shutdown.is_requested() {
            if !self.step() {
                self.shutdown.sleep(self.idle_yield);
            }
        }
    }

    /// Stops the workers, waiting up to the grace period for them to exit.
    pub fn shutdown(self) {
        self.trigger.trigger();

        let deadline = Instant::now() + self.shutdown_grace;
        let mut pending = self.workers;
        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(remaining) {
                Ok(name) => pending.retain(|w| *w != name),
                Err(_) => break,
            }
        }

        if pending.is_empty() {
            info!("all workers stopped");
        } else {
            warn!(?pending, "workers did not stop within the grace period");
        }
    }
}
