//! Narrator: a terminal player for spoken study notes.
//!
//! Plays narration payloads (raw or base64 16-bit PCM at 24 kHz, or any
//! container Symphonia can read) with play/pause, 10 s seeking and a
//! 1x/1.5x/2x speed cycle. `say` sends text to a speech service first.
//!
//! ## Modes
//! - default: ratatui player; logs go to the in-app pane (or `--log-file`).
//! - `--headless`: play to the end, logging progress to stderr.
//! - `--dry-run`: no audio device; a simulated output follows wall time.

mod cli;
mod config;
mod headless;
mod logging;
mod media_panel;
mod runtime;
mod source;
mod speech;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    runtime::run(args)
}
