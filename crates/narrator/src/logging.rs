//! Tracing subscriber setup.
//!
//! The terminal UI owns the screen, so while it runs logs go either to a file
//! (`--log-file`) or to the in-app log pane through a channel.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_FILTER: &str = "info,narrator=info,narration_player=info";

pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    Pane(Sender<String>),
}

pub fn init(target: LogTarget<'_>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match target {
        LogTarget::Stderr => builder.with_writer(io::stderr).init(),
        LogTarget::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {:?}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        LogTarget::Pane(tx) => builder
            .with_ansi(false)
            .with_target(false)
            .with_writer(PaneWriter::new(tx))
            .init(),
    }
    Ok(())
}

/// Forwards each formatted event to the UI as individual lines.
#[derive(Clone)]
pub struct PaneWriter {
    tx: Sender<String>,
}

impl PaneWriter {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl<'a> MakeWriter<'a> for PaneWriter {
    type Writer = PaneLine;

    fn make_writer(&'a self) -> PaneLine {
        PaneLine {
            tx: self.tx.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffer for one event; lines are sent on flush or drop.
pub struct PaneLine {
    tx: Sender<String>,
    buf: Vec<u8>,
}

impl Write for PaneLine {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            // The pane may already be gone during shutdown.
            let _ = self.tx.send(line.to_string());
        }
        Ok(())
    }
}

impl Drop for PaneLine {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
