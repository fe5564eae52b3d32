//! Playback engine for decoded narration audio.
//!
//! Data flow: [`decode`] turns a payload into a [`decode::PcmBuffer`], the
//! [`engine::PlaybackEngine`] plays it through an [`output::AudioOutput`]
//! (CPAL device or simulated), and a [`progress::ProgressReporter`] ticked
//! once per frame publishes the position.

pub mod config;
pub mod cpal_output;
pub mod decode;
pub mod device;
pub mod engine;
pub mod error;
pub mod media_session;
pub mod output;
pub mod progress;
pub mod sim;

pub use config::{OutputConfig, PlayerConfig};
pub use engine::{DecodedLoad, PendingLoad, PlaybackEngine};
pub use error::{DecodeError, PlayerError};
pub use progress::ProgressReporter;
