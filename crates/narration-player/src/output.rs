//! Output path abstraction.
//!
//! An [`AudioOutput`] is the long-lived device connection owned by the engine.
//! It exposes a monotonic clock and starts [`Voice`]s: start-once generators
//! that play a decoded buffer from an offset and cannot be restarted after
//! they stop.

use anyhow::Result;

use crate::decode::PcmBuffer;
use crate::error::VoiceStopped;

/// Lifecycle of the shared output path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputState {
    Running,
    /// Created but not producing sound (autoplay policy, explicit suspend).
    Suspended,
    Closed,
}

/// Long-lived audio output connection.
pub trait AudioOutput {
    type Voice: Voice;

    /// Seconds of audio rendered since the output was created. Monotonic.
    fn current_time(&self) -> f64;

    fn state(&self) -> OutputState;

    /// Bring a suspended output back to [`OutputState::Running`].
    fn resume(&mut self) -> Result<()>;

    /// Start a fresh voice playing `buffer` from `offset_secs` at `rate`.
    ///
    /// Any previously started voice keeps running until it is stopped; the
    /// engine guarantees at most one is live.
    fn start_voice(&mut self, buffer: &PcmBuffer, offset_secs: f64, rate: f64)
    -> Result<Self::Voice>;

    /// Release the device. Further voices cannot be started.
    fn close(&mut self);
}

/// Handle to one start-once playback generator.
pub trait Voice {
    /// Change the playback rate of the running voice in place.
    fn set_rate(&self, rate: f64);

    /// Stop the voice. A second call reports [`VoiceStopped`].
    fn stop(&mut self) -> Result<(), VoiceStopped>;
}
