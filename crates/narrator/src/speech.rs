//! Text-to-speech client.
//!
//! The speech service returns base64 raw PCM (mono, 16-bit, 24 kHz), which is
//! exactly what the engine's [`TrackSource::Base64Pcm`] path decodes.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use narration_types::TrackSource;

/// Message shown when no API key is configured.
pub const MISSING_KEY_MESSAGE: &str = "AI Service Unavailable: Missing API Key.";

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_VOICE: &str = "Kore";

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub endpoint: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Anything that can turn text into a narration payload.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str) -> Result<TrackSource>;
}

/// Gemini `generateContent` client requesting audio output.
pub struct GeminiSpeech {
    api_key: String,
    model: String,
    voice: String,
    endpoint: String,
}

impl GeminiSpeech {
    /// Build a client, or `None` when no API key is configured.
    pub fn from_config(cfg: &SpeechConfig) -> Option<Self> {
        let Some(api_key) = cfg.api_key.clone() else {
            tracing::warn!("speech API key is missing");
            return None;
        };
        Some(Self {
            api_key,
            model: cfg.model.clone(),
            voice: cfg.voice.clone(),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl SpeechSynthesizer for GeminiSpeech {
    fn synthesize(&self, text: &str) -> Result<TrackSource> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("nothing to synthesize"));
        }
        tracing::info!(model = %self.model, voice = %self.voice, chars = text.len(), "requesting speech");
        let mut resp = ureq::post(&self.url())
            .header("x-goog-api-key", self.api_key.as_str())
            .send_json(build_request(text, &self.voice))
            .context("request speech synthesis")?;
        let body = resp
            .body_mut()
            .read_to_string()
            .context("read speech response body")?;
        let data = extract_audio(&body)?;
        tracing::info!(bytes = data.len(), "speech received");
        Ok(TrackSource::Base64Pcm { data })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    speech_config: SpeechVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechVoiceConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoice,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice {
    voice_name: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn build_request(text: &str, voice: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["AUDIO"],
            speech_config: SpeechVoiceConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoice {
                        voice_name: voice.to_string(),
                    },
                },
            },
        },
    }
}

/// Pull the first inline audio payload out of a `generateContent` response.
fn extract_audio(body: &str) -> Result<String> {
    let resp: GenerateResponse =
        serde_json::from_str(body).context("decode speech response")?;
    resp.candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.inline_data)
        .map(|d| d.data)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| anyhow!("speech response contained no audio"))
}
