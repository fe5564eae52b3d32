use serde::{Deserialize, Serialize};

/// Album label published to media surfaces when a track does not carry one.
pub const DEFAULT_ALBUM_LABEL: &str = "OticLearn Audio Notes";

/// 512x512 artwork published with now-playing metadata unless configured.
pub const DEFAULT_ARTWORK_URL: &str = "https://picsum.photos/512/512";

/// Encoded audio payload carried by an [`AudioTrack`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackSource {
    /// Base64 text wrapping raw mono 16-bit little-endian PCM at the contract rate.
    Base64Pcm { data: String },
    /// Raw mono 16-bit little-endian PCM at the contract rate.
    RawPcm { data: Vec<u8> },
    /// A container file (WAV, FLAC, MP3, ...) probed by the decoder.
    Encoded {
        data: Vec<u8>,
        /// File extension hint (for example `wav`).
        extension: Option<String>,
    },
}

impl TrackSource {
    /// Size of the encoded payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            TrackSource::Base64Pcm { data } => data.len(),
            TrackSource::RawPcm { data } => data.len(),
            TrackSource::Encoded { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackSource::Base64Pcm { .. } => "base64_pcm",
            TrackSource::RawPcm { .. } => "raw_pcm",
            TrackSource::Encoded { .. } => "encoded",
        }
    }
}

/// One playable narration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioTrack {
    /// Stable identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Author or narrator label.
    pub author: String,
    /// Encoded payload.
    pub src: TrackSource,
    /// Known duration in seconds; the decoded buffer wins when they disagree.
    pub duration: Option<f64>,
}

/// Coarse engine state as seen by a UI.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// No track loaded.
    #[default]
    Empty,
    /// A decode is in flight.
    Loading,
    /// Track loaded and paused (or stopped at 0).
    Paused,
    /// Track loaded and playing.
    Playing,
    /// Playback reached the end of the track.
    Ended,
}

/// Reason why the last playback run stopped.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackEndReason {
    /// Natural end of the track.
    Eof,
    /// The track could not be decoded.
    Error,
    /// Playback was explicitly stopped or closed.
    Stopped,
}

/// Renderable view of the engine state.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    /// Identifier of the active track, if any.
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub is_playing: bool,
    /// Current playback rate multiplier.
    pub playback_rate: f64,
    /// Elapsed track time in seconds.
    pub current_time: f64,
    /// Total duration in seconds (0 until decoded).
    pub duration: f64,
    /// `100 * current_time / duration`, 0 when duration is unknown.
    pub progress_percent: f64,
    /// Load generation that produced this session.
    pub generation: u64,
    /// Set when the last run ended or failed.
    pub end_reason: Option<PlaybackEndReason>,
}

/// Value published by the progress reporter on every tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressUpdate {
    /// Elapsed track time in seconds, clamped to `duration`.
    pub current_time: f64,
    pub duration: f64,
    pub progress_percent: f64,
    /// `true` on the final update of a track that reached its end.
    pub ended: bool,
}

impl ProgressUpdate {
    /// Build an update, deriving the percentage from time and duration.
    pub fn new(current_time: f64, duration: f64, ended: bool) -> Self {
        Self {
            current_time,
            duration,
            progress_percent: progress_percent(current_time, duration),
            ended,
        }
    }
}

/// `100 * current / duration` clamped to `0..=100`; 0 for non-positive durations.
pub fn progress_percent(current: f64, duration: f64) -> f64 {
    if !(duration > 0.0) {
        return 0.0;
    }
    (current / duration * 100.0).clamp(0.0, 100.0)
}

/// Metadata published to platform media surfaces.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub author: String,
    pub album: String,
    pub artwork_url: Option<String>,
}

/// Transport actions a platform media surface can trigger.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    Play,
    Pause,
    TogglePlayPause,
    SeekBackward,
    SeekForward,
}

/// Playback state advertised to platform media surfaces.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaPlaybackState {
    None,
    Paused,
    Playing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percent_handles_zero_duration() {
        assert_eq!(progress_percent(3.0, 0.0), 0.0);
        assert_eq!(progress_percent(3.0, f64::NAN), 0.0);
    }

    #[test]
    fn progress_percent_clamps() {
        assert_eq!(progress_percent(5.0, 10.0), 50.0);
        assert_eq!(progress_percent(12.0, 10.0), 100.0);
        assert_eq!(progress_percent(-1.0, 10.0), 0.0);
    }

    #[test]
    fn track_source_serializes_with_kind_tag() {
        let src = TrackSource::Base64Pcm {
            data: "AAA=".to_string(),
        };
        let json = serde_json::to_string(&src).unwrap();
        assert_eq!(json, r#"{"kind":"base64_pcm","data":"AAA="}"#);
    }

    #[test]
    fn playback_phase_defaults_to_empty() {
        assert_eq!(PlaybackPhase::default(), PlaybackPhase::Empty);
        let snap = PlaybackSnapshot::default();
        assert!(!snap.is_playing);
        assert!(snap.track_id.is_none());
    }
}
