mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Args;
use duetto::audio::AudioOutput;
use duetto::gateway::{Fanout, OscOutput};
use duetto::timing::shutdown_channel;
use duetto::{Config, RandomWalkModel, spawn_engine};

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &args.write_default_config {
        Config::default().save(path)?;
        info!("wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);

    let (trigger, shutdown) = shutdown_channel();
    let ctrlc_trigger = trigger.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received, exiting");
        ctrlc_trigger.trigger();
    })?;

    let mut output = Fanout::new().with(Arc::new(OscOutput::connect(
        &config.osc.target_addr,
        &config.osc.output_address,
    )?));
    if config.audio.enabled {
        output = output.with(Arc::new(AudioOutput::start(&config.audio, shutdown.clone())?));
    }

    let model = RandomWalkModel::new(config.model.clone());
    let mut engine = spawn_engine(&config, model, Arc::new(output), trigger, shutdown)?;

    engine.run();
    engine.shutdown();
    info!("done, shutting down");
    Ok(())
}
