use std::path::PathBuf;

use clap::Parser;

use duetto::Config;
use duetto::RunMode;
use duetto::gateway::InteractionLog;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Predictive musical interaction between a performer and a sequence model")]
pub struct Args {
    /// Path to config RON
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Save human and model events to a log file
    #[arg(short, long)]
    pub log: bool,

    /// User control only, no model
    #[arg(short = 'o', long = "only", group = "mode")]
    pub user_only: bool,

    /// Model playback only
    #[arg(short = 'r', long = "rnn", group = "mode")]
    pub model_only: bool,

    /// Call and response
    #[arg(short = 'c', long = "call", group = "mode")]
    pub call_response: bool,

    /// Model harmonizes with the performer
    #[arg(short = 'p', long, group = "mode")]
    pub polyphony: bool,

    /// Model and performer play independently
    #[arg(short = 'b', long, group = "mode")]
    pub battle: bool,

    /// Address of the sound engine
    #[arg(long)]
    pub clientip: Option<String>,

    /// Port the sound engine listens on
    #[arg(long)]
    pub clientport: Option<u16>,

    /// Address to listen on for performer input
    #[arg(long)]
    pub serverip: Option<String>,

    /// Port to listen on for performer input
    #[arg(long)]
    pub serverport: Option<u16>,

    /// Also take input from the MIDI port whose name contains this
    #[arg(long)]
    pub midi: Option<String>,

    /// Render events through the built-in synth
    #[arg(long)]
    pub audio: bool,

    /// Log per-event routing
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the default config to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_default_config: Option<PathBuf>,
}

impl Args {
    pub fn run_mode(&self) -> Option<RunMode> {
        if self.user_only {
            Some(RunMode::UserOnly)
        } else if self.model_only {
            Some(RunMode::ModelOnly)
        } else if self.call_response {
            Some(RunMode::CallResponse)
        } else if self.polyphony {
            Some(RunMode::Polyphony)
        } else if self.battle {
            Some(RunMode::Battle)
        } else {
            None
        }
    }

    /// Command-line flags win over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.run_mode() {
            config.run_mode = mode;
        }
        config.osc.target_addr = override_addr(
            &config.osc.target_addr,
            self.clientip.as_deref(),
            self.clientport,
        );
        config.osc.listen_addr = override_addr(
            &config.osc.listen_addr,
            self.serverip.as_deref(),
            self.serverport,
        );
        if self.midi.is_some() {
            config.midi.port_name = self.midi.clone();
        }
        if self.audio {
            config.audio.enabled = true;
        }
        if self.log && config.log_file.is_none() {
            config.log_file = Some(InteractionLog::default_path());
        }
    }
}

fn override_addr(addr: &str, ip: Option<&str>, port: Option<u16>) -> String {
    let (host, old_port) = addr.rsplit_once(':').unwrap_or((addr, ""));
    let host = match ip {
        Some("localhost") => "127.0.0.1",
        Some(ip) => ip,
        None => host,
    };
    match port {
        Some(port) => format!("{host}:{port}"),
        None => format!("{host}:{old_port}"),
    }
}
