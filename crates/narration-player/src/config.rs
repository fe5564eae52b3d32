use narration_types::{DEFAULT_ALBUM_LABEL, DEFAULT_ARTWORK_URL};

/// Sample rate of the speech service's raw PCM output, in Hz.
pub const CONTRACT_SAMPLE_RATE: u32 = 24_000;

/// Engine tuning shared by decode and transport.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Sample rate assumed for raw/base64 PCM payloads.
    pub contract_sample_rate: u32,
    /// Seconds moved by the seek-backward/seek-forward media actions.
    pub seek_step_seconds: f64,
    /// Album label published with now-playing metadata.
    pub album_label: String,
    /// Artwork URL published with now-playing metadata.
    pub artwork_url: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            contract_sample_rate: CONTRACT_SAMPLE_RATE,
            seek_step_seconds: 10.0,
            album_label: DEFAULT_ALBUM_LABEL.to_string(),
            artwork_url: Some(DEFAULT_ARTWORK_URL.to_string()),
        }
    }
}

/// Output device selection and stream sizing.
#[derive(Clone, Debug, Default)]
pub struct OutputConfig {
    /// Output device substring match; `None` uses the host default.
    pub device: Option<String>,
    /// Preferred device sample rate; `None` targets the contract rate.
    pub target_rate: Option<u32>,
    /// Upper bound for a fixed device buffer size in frames.
    pub buffer_frames_max: Option<u32>,
}
