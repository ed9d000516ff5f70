mod common;

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{RecordingOutput, ScriptedModel, wait_until};
use duetto::config::ModelConfig;
use duetto::error::EngineError;
use duetto::timing::shutdown_channel;
use duetto::{
    Config, Engine, Event, EventModel, Origin, Phase, RandomWalkModel, RawInput, RoutingFlags,
    RunMode, spawn_engine,
};
use rosc::{OscMessage, OscPacket, OscType};

fn test_config(run_mode: RunMode) -> Config {
    let mut config = Config::default();
    config.run_mode = run_mode;
    config.osc.listen_addr = "127.0.0.1:0".to_string();
    config.call_response_threshold_secs = 0.05;
    config.shutdown_grace_ms = 500;
    config
}

fn fast_model() -> RandomWalkModel {
    RandomWalkModel::new(ModelConfig {
        seed: Some(1),
        mean_delay_secs: 0.01,
        ..ModelConfig::default()
    })
}

fn start<M: EventModel>(config: &Config, model: M) -> (Engine<M>, Arc<RecordingOutput>) {
    let output = Arc::new(RecordingOutput::default());
    let (trigger, shutdown) = shutdown_channel();
    let engine = spawn_engine(config, model, output.clone(), trigger, shutdown).unwrap();
    (engine, output)
}

fn touch(position: f32) -> RawInput {
    RawInput::Osc(OscMessage {
        addr: "/interface".to_string(),
        args: vec![OscType::Float(position)],
    })
}

fn run_for<M: EventModel>(engine: &mut Engine<M>, duration: Duration) {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if !engine.step() {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

#[test]
fn user_only_plays_the_human_and_nothing_else() {
    let (mut engine, output) = start(&test_config(RunMode::UserOnly), fast_model());

    engine.input().on_human_input(&touch(0.4));
    run_for(&mut engine, Duration::from_millis(50));

    assert!(engine.queue().is_empty());
    assert_eq!(output.count(Origin::Model), 0);
    assert_eq!(output.positions(Origin::Human), vec![0.4f32 as f64]);
    engine.shutdown();
}

#[test]
fn battle_is_autonomous_from_the_start_and_stays_so() {
    let (mut engine, output) = start(&test_config(RunMode::Battle), fast_model());
    assert_eq!(engine.state().routing(), RoutingFlags::AUTONOMOUS);

    for i in 0..10 {
        engine.input().on_human_input(&touch(i as f32 / 10.0));
        run_for(&mut engine, Duration::from_millis(15));
        assert_eq!(engine.state().routing(), RoutingFlags::AUTONOMOUS);
    }
    run_for(&mut engine, Duration::from_millis(100));
    assert_eq!(engine.state().routing(), RoutingFlags::AUTONOMOUS);

    assert!(output.count(Origin::Model) > 0);
    assert_eq!(output.count(Origin::Human), 10);
    engine.shutdown();
}

#[test]
fn routing_is_fixed_outside_call_response() {
    for mode in [
        RunMode::UserOnly,
        RunMode::ModelOnly,
        RunMode::Polyphony,
        RunMode::Battle,
    ] {
        let (mut engine, _output) = start(&test_config(mode), fast_model());
        let initial = engine.state().routing();
        assert_eq!(initial, mode.initial_routing());

        // Bursts of input separated by silences longer than the threshold.
        for burst in 0..3 {
            for i in 0..3 {
                engine.input().on_human_input(&touch((burst * 3 + i) as f32 / 10.0));
                run_for(&mut engine, Duration::from_millis(5));
            }
            run_for(&mut engine, Duration::from_millis(80));
            assert_eq!(engine.state().routing(), initial, "{mode}");
        }
        engine.shutdown();
    }
}

#[test]
fn model_only_does_not_echo_the_human() {
    let (mut engine, output) = start(&test_config(RunMode::ModelOnly), fast_model());

    engine.input().on_human_input(&touch(0.3));
    run_for(&mut engine, Duration::from_millis(100));

    assert_eq!(output.count(Origin::Human), 0);
    assert!(output.count(Origin::Model) > 0);
    engine.shutdown();
}

#[test]
fn interaction_log_records_every_human_event_once() {
    for mode in [RunMode::ModelOnly, RunMode::UserOnly] {
        let path = std::env::temp_dir().join(format!(
            "duetto_engine_log_{:?}_{}",
            mode,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let mut config = test_config(mode);
        config.log_file = Some(path.clone());
        let (mut engine, output) = start(&config, fast_model());

        engine.input().on_human_input(&touch(0.4));
        run_for(&mut engine, Duration::from_millis(100));
        engine.shutdown();

        let text = std::fs::read_to_string(&path).unwrap();
        let human: Vec<&str> = text.lines().filter(|l| l.contains(",user,")).collect();
        assert_eq!(human.len(), 1, "{mode}");
        assert!(human[0].ends_with(&format!(",user,{}", 0.4f32 as f64)), "{mode}");
        if mode == RunMode::ModelOnly {
            assert_eq!(output.count(Origin::Human), 0);
            assert!(text.lines().any(|l| l.contains(",rnn,")));
        }
        let _ = std::fs::remove_file(&path);
    }
}

#[test]
fn call_response_round_trip() {
    let (mut engine, output) = start(&test_config(RunMode::CallResponse), fast_model());
    assert_eq!(engine.state().phase(), Phase::Call);

    engine.input().on_human_input(&touch(0.5));
    run_for(&mut engine, Duration::from_millis(20));
    assert_eq!(engine.state().phase(), Phase::Call);
    assert_eq!(output.count(Origin::Model), 0);

    run_for(&mut engine, Duration::from_millis(150));
    assert_eq!(engine.state().phase(), Phase::Response);
    assert_eq!(engine.state().routing(), RoutingFlags::AUTONOMOUS);
    assert!(wait_until(Duration::from_secs(2), || {
        output.count(Origin::Model) > 0
    }));

    engine.input().on_human_input(&touch(0.9));
    engine.step();
    assert_eq!(engine.state().phase(), Phase::Call);
    assert!(engine.queue().is_empty());
    assert!(!engine.state().routing().model_drives_output);
    engine.shutdown();
}

#[test]
fn osc_input_reaches_shared_state() {
    let (engine, _output) = start(&test_config(RunMode::UserOnly), fast_model());

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let packet = OscPacket::Message(OscMessage {
        addr: "/interface".to_string(),
        args: vec![OscType::Float(0.625)],
    });
    let buf = rosc::encoder::encode(&packet).unwrap();
    sender.send_to(&buf, engine.osc_addr()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        engine.state().last_human_event().position == 0.625
    }));
    engine.shutdown();
}

#[test]
fn model_load_failure_aborts_startup() {
    let mut model = ScriptedModel::repeating(Event::new(0.1, 0.5));
    model.fail_load = true;
    let (trigger, shutdown) = shutdown_channel();
    let result = spawn_engine(
        &test_config(RunMode::Polyphony),
        model,
        Arc::new(RecordingOutput::default()),
        trigger,
        shutdown,
    );
    assert!(matches!(result, Err(EngineError::ModelLoad(_))));
}

#[test]
fn run_returns_after_shutdown_is_triggered() {
    let config = test_config(RunMode::ModelOnly);
    let output = Arc::new(RecordingOutput::default());
    let (trigger, shutdown) = shutdown_channel();
    let mut engine = spawn_engine(&config, fast_model(), output, trigger.clone(), shutdown).unwrap();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        trigger.trigger();
    });
    engine.run();
    stopper.join().unwrap();

    let start = Instant::now();
    engine.shutdown();
    assert!(start.elapsed() < Duration::from_secs(2));
}
