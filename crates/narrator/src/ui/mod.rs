//! Ratatui UI loop.
//!
//! Keys:
//! - Space: play/pause
//! - Left/Right: seek back/forward 10s
//! - s: cycle playback speed
//! - x: stop
//! - c: close the player
//! - r: reload the track
//! - l: logs, h/?: help
//! - q: quit

mod app;
mod render;

pub(crate) use app::run_tui;
