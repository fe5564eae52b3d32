//! Error taxonomy for decode and transport.

use thiserror::Error;

/// A payload could not be turned into playable samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("PCM payload has odd length {len}; expected whole 16-bit samples")]
    OddByteLength { len: usize },

    #[error("payload contains no audio frames")]
    Empty,

    #[error("no decodable audio track in container")]
    NoAudioTrack,

    #[error("container does not declare a sample rate")]
    UnknownSampleRate,

    #[error("container decode failed: {0}")]
    Container(#[from] symphonia::core::errors::Error),
}

/// Failures reported by [`crate::engine::PlaybackEngine`] operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Terminal for the load attempt that produced it.
    #[error("could not load audio: {0}")]
    Decode(#[from] DecodeError),

    /// The shared output path could not be created or resumed.
    #[error("audio output unavailable: {0}")]
    ResourceUnavailable(String),

    /// A result arrived for a load that has since been superseded.
    #[error("stale load generation {generation} (current {current})")]
    StaleGeneration { generation: u64, current: u64 },
}

impl PlayerError {
    /// Whether the error must be discarded without reaching the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, PlayerError::StaleGeneration { .. })
    }
}

/// Returned by [`crate::output::Voice::stop`] when the voice was already stopped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("voice already stopped")]
pub struct VoiceStopped;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_generation_is_silent() {
        let err = PlayerError::StaleGeneration {
            generation: 1,
            current: 2,
        };
        assert!(err.is_silent());
        assert!(!PlayerError::ResourceUnavailable("blocked".into()).is_silent());
        assert!(!PlayerError::Decode(DecodeError::Empty).is_silent());
    }

    #[test]
    fn decode_error_message_names_length() {
        let err = DecodeError::OddByteLength { len: 3 };
        assert!(err.to_string().contains('3'));
    }
}
