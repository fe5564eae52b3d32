//! Configuration loading and parsing.
//!
//! Optional TOML file with `[player]`, `[output]` and `[speech]` tables.
//! Command-line flags win over file values; unset values use library defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use narration_player::{OutputConfig, PlayerConfig};

use crate::speech::SpeechConfig;

/// Top-level narrator configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct NarratorConfig {
    pub player: Option<PlayerSection>,
    pub output: Option<OutputSection>,
    pub speech: Option<SpeechSection>,
}

/// `[player]` table.
#[derive(Debug, Default, Deserialize)]
pub struct PlayerSection {
    /// Sample rate of raw/base64 PCM payloads (default 24000).
    pub contract_sample_rate: Option<u32>,
    /// Seconds moved by seek keys and media actions (default 10).
    pub seek_step_seconds: Option<f64>,
    /// Album label published with now-playing metadata.
    pub album_label: Option<String>,
    pub artwork_url: Option<String>,
}

/// `[output]` table.
#[derive(Debug, Default, Deserialize)]
pub struct OutputSection {
    /// Output device substring match.
    pub device: Option<String>,
    /// Preferred device sample rate.
    pub target_rate: Option<u32>,
    /// Upper bound for a fixed device buffer size in frames.
    pub buffer_frames_max: Option<u32>,
}

/// `[speech]` table.
#[derive(Debug, Default, Deserialize)]
pub struct SpeechSection {
    /// API key; falls back to `GEMINI_API_KEY`, then `API_KEY`.
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    /// Base URL override for the generative language API.
    pub endpoint: Option<String>,
}

impl NarratorConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<NarratorConfig>(raw)?)
    }

    /// Resolve engine settings.
    pub fn player_config(&self) -> PlayerConfig {
        let mut cfg = PlayerConfig::default();
        if let Some(section) = self.player.as_ref() {
            if let Some(rate) = section.contract_sample_rate.filter(|r| *r > 0) {
                cfg.contract_sample_rate = rate;
            }
            if let Some(step) = section.seek_step_seconds.filter(|s| s.is_finite() && *s > 0.0) {
                cfg.seek_step_seconds = step;
            }
            if let Some(label) = section.album_label.clone() {
                cfg.album_label = label;
            }
            if let Some(url) = section.artwork_url.clone() {
                cfg.artwork_url = Some(url);
            }
        }
        cfg
    }

    /// Resolve output settings; `device_override` comes from `--device`.
    pub fn output_config(&self, device_override: Option<&str>) -> OutputConfig {
        let section = self.output.as_ref();
        let device = device_override
            .map(str::to_string)
            .or_else(|| section.and_then(|s| s.device.clone()))
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        OutputConfig {
            device,
            target_rate: section.and_then(|s| s.target_rate),
            buffer_frames_max: section.and_then(|s| s.buffer_frames_max),
        }
    }

    /// Resolve speech settings, reading the API key from the environment when unset.
    pub fn speech_config(&self) -> SpeechConfig {
        self.speech_config_with_env(|name| std::env::var(name).ok())
    }

    fn speech_config_with_env(&self, env: impl Fn(&str) -> Option<String>) -> SpeechConfig {
        let section = self.speech.as_ref();
        let api_key = section
            .and_then(|s| s.api_key.clone())
            .or_else(|| env("GEMINI_API_KEY"))
            .or_else(|| env("API_KEY"))
            .filter(|k| !k.trim().is_empty());
        let mut cfg = SpeechConfig {
            api_key,
            ..SpeechConfig::default()
        };
        if let Some(model) = section.and_then(|s| s.model.clone()) {
            cfg.model = model;
        }
        if let Some(voice) = section.and_then(|s| s.voice.clone()) {
            cfg.voice = voice;
        }
        if let Some(endpoint) = section.and_then(|s| s.endpoint.clone()) {
            cfg.endpoint = endpoint;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = NarratorConfig::parse("").unwrap();
        let player = cfg.player_config();
        assert_eq!(player.contract_sample_rate, 24_000);
        assert_eq!(player.seek_step_seconds, 10.0);
        assert_eq!(player.album_label, narration_types::DEFAULT_ALBUM_LABEL);
        assert_eq!(
            player.artwork_url.as_deref(),
            Some(narration_types::DEFAULT_ARTWORK_URL)
        );
        assert!(cfg.output_config(None).device.is_none());
    }

    #[test]
    fn artwork_keeps_default_unless_set() {
        let cfg = NarratorConfig::parse("[player]\nalbum_label = \"Notes\"\n").unwrap();
        assert_eq!(
            cfg.player_config().artwork_url.as_deref(),
            Some(narration_types::DEFAULT_ARTWORK_URL)
        );
        let cfg = NarratorConfig::parse("[player]\nartwork_url = \"https://example.org/a.png\"\n")
            .unwrap();
        assert_eq!(
            cfg.player_config().artwork_url.as_deref(),
            Some("https://example.org/a.png")
        );
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = NarratorConfig::parse(
            r#"
            [player]
            seek_step_seconds = 5.0
            album_label = "Lecture Notes"

            [output]
            device = "Speakers"
            buffer_frames_max = 2048

            [speech]
            voice = "Puck"
            "#,
        )
        .unwrap();
        let player = cfg.player_config();
        assert_eq!(player.seek_step_seconds, 5.0);
        assert_eq!(player.album_label, "Lecture Notes");
        let output = cfg.output_config(None);
        assert_eq!(output.device.as_deref(), Some("Speakers"));
        assert_eq!(output.buffer_frames_max, Some(2048));
        assert_eq!(cfg.speech_config_with_env(|_| None).voice, "Puck");
    }

    #[test]
    fn cli_device_wins_over_file() {
        let cfg = NarratorConfig::parse("[output]\ndevice = \"Speakers\"\n").unwrap();
        let output = cfg.output_config(Some("USB"));
        assert_eq!(output.device.as_deref(), Some("USB"));
        assert!(cfg.output_config(Some("  ")).device.is_none());
    }

    #[test]
    fn invalid_player_values_are_ignored() {
        let cfg =
            NarratorConfig::parse("[player]\ncontract_sample_rate = 0\nseek_step_seconds = -3.0\n")
                .unwrap();
        let player = cfg.player_config();
        assert_eq!(player.contract_sample_rate, 24_000);
        assert_eq!(player.seek_step_seconds, 10.0);
    }

    #[test]
    fn api_key_falls_back_to_environment() {
        let cfg = NarratorConfig::default();
        let key = cfg
            .speech_config_with_env(|name| (name == "API_KEY").then(|| "from-env".to_string()))
            .api_key;
        assert_eq!(key.as_deref(), Some("from-env"));

        let preferred = cfg
            .speech_config_with_env(|name| Some(format!("{name}-value")))
            .api_key;
        assert_eq!(preferred.as_deref(), Some("GEMINI_API_KEY-value"));

        assert!(cfg.speech_config_with_env(|_| None).api_key.is_none());
    }

    #[test]
    fn mistyped_values_are_rejected() {
        assert!(NarratorConfig::parse("[player]\nseek_step_seconds = \"fast\"\n").is_err());
    }
}
