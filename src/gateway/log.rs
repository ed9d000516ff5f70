use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::OutputGateway;
use crate::error::OutputError;
use crate::events::{Event, Origin};

/// Append-only `timestamp,origin,position` record of everything played.
pub struct InteractionLog {
    writer: Mutex<BufWriter<File>>,
}

impl InteractionLog {
    pub fn open(path: &Path) -> Result<Self, OutputError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// `<local time>-duetto.log` in the working directory.
    pub fn default_path() -> PathBuf {
        let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
        PathBuf::from(format!("{stamp}-duetto.log"))
    }
}

impl OutputGateway for InteractionLog {
    fn emit(&self, origin: Origin, event: &Event) -> Result<(), OutputError> {
        let mut writer = self.writer.lock();
        writeln!(
            writer,
            "{},{},{}",
            chrono::Local::now().to_rfc3339(),
            origin,
            event.position
        )?;
        writer.flush()?;
        Ok(())
    }
}
