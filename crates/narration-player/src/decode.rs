//! One-shot audio decode stage.
//!
//! Turns a [`TrackSource`] into a mono [`PcmBuffer`]:
//! - base64/raw payloads are mono 16-bit little-endian PCM at the contract rate
//! - encoded payloads are probed with Symphonia and mixed down to mono
//!
//! Decoding happens once per load; every playback voice reads the same buffer.

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use narration_types::TrackSource;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::{
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use crate::error::DecodeError;

/// Decoded mono samples normalized to `[-1.0, 1.0]`.
#[derive(Clone, Debug)]
pub struct PcmBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Wrap already-normalized mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    /// Buffer length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated sample at fractional frame `pos`; 0 past the end.
    pub fn sample_at(&self, pos: f64) -> f32 {
        if !(pos >= 0.0) {
            return 0.0;
        }
        let idx = pos.floor() as usize;
        let Some(&a) = self.samples.get(idx) else {
            return 0.0;
        };
        let b = self.samples.get(idx + 1).copied().unwrap_or(0.0);
        let frac = (pos - idx as f64) as f32;
        a + (b - a) * frac
    }
}

/// Decode any supported payload.
///
/// `contract_rate` applies to raw/base64 PCM; encoded payloads keep their native rate.
pub fn decode_source(src: &TrackSource, contract_rate: u32) -> Result<PcmBuffer, DecodeError> {
    let buffer = match src {
        TrackSource::Base64Pcm { data } => decode_base64_pcm(data, contract_rate)?,
        TrackSource::RawPcm { data } => decode_pcm_s16le(data, contract_rate)?,
        TrackSource::Encoded { data, extension } => {
            decode_encoded(data.clone(), extension.as_deref())?
        }
    };
    if buffer.frames() == 0 {
        return Err(DecodeError::Empty);
    }
    tracing::debug!(
        kind = src.kind(),
        frames = buffer.frames(),
        rate_hz = buffer.sample_rate(),
        "payload decoded"
    );
    Ok(buffer)
}

/// Decode base64 text wrapping mono 16-bit little-endian PCM.
///
/// ASCII whitespace (line wrapping) is ignored.
pub fn decode_base64_pcm(text: &str, sample_rate: u32) -> Result<PcmBuffer, DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;
    decode_pcm_s16le(&bytes, sample_rate)
}

/// Convert mono 16-bit little-endian PCM bytes to normalized `f32` samples.
pub fn decode_pcm_s16le(bytes: &[u8], sample_rate: u32) -> Result<PcmBuffer, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddByteLength { len: bytes.len() });
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Ok(PcmBuffer::new(samples, sample_rate))
}

/// Decode a container payload with Symphonia, mixing all channels down to mono.
fn decode_encoded(data: Vec<u8>, extension: Option<&str>) -> Result<PcmBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension.filter(|e| !e.is_empty()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!("decode error (skipping packet): {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let channels = decoded.spec().channels.count().max(1);
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        sample_buf.copy_interleaved_ref(decoded);
        mix_to_mono(sample_buf.samples(), channels, &mut mono);
    }

    Ok(PcmBuffer::new(mono, rate))
}

/// Average interleaved frames into `out`.
fn mix_to_mono(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn pcm_s16le_normalizes_extremes() {
        let buf = decode_pcm_s16le(&pcm_bytes(&[i16::MIN, 0, 16384, i16::MAX]), 24_000).unwrap();
        assert_eq!(buf.samples()[0], -1.0);
        assert_eq!(buf.samples()[1], 0.0);
        assert_eq!(buf.samples()[2], 0.5);
        assert!(buf.samples()[3] < 1.0 && buf.samples()[3] > 0.999);
    }

    #[test]
    fn pcm_s16le_rejects_odd_length() {
        let err = decode_pcm_s16le(&[0, 1, 2], 24_000).unwrap_err();
        assert!(matches!(err, DecodeError::OddByteLength { len: 3 }));
    }

    #[test]
    fn base64_pcm_ignores_line_wrapping() {
        let encoded = STANDARD.encode(pcm_bytes(&[0, 16384, -16384, 0]));
        let (head, tail) = encoded.split_at(4);
        let wrapped = format!("{head}\n  {tail}\r\n");
        let buf = decode_base64_pcm(&wrapped, 24_000).unwrap();
        assert_eq!(buf.frames(), 4);
        assert_eq!(buf.samples()[2], -0.5);
    }

    #[test]
    fn base64_pcm_rejects_garbage() {
        let err = decode_base64_pcm("not base64 !!", 24_000).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidBase64(_)));
    }

    #[test]
    fn decode_source_rejects_empty_payload() {
        let src = TrackSource::RawPcm { data: Vec::new() };
        assert!(matches!(decode_source(&src, 24_000), Err(DecodeError::Empty)));
    }

    #[test]
    fn duration_follows_sample_rate() {
        let buf = PcmBuffer::new(vec![0.0; 48_000], 24_000);
        assert_eq!(buf.duration_secs(), 2.0);
        assert_eq!(PcmBuffer::new(vec![0.0; 10], 0).duration_secs(), 0.0);
    }

    #[test]
    fn sample_at_interpolates_and_pads() {
        let buf = PcmBuffer::new(vec![0.0, 1.0], 2);
        assert_eq!(buf.sample_at(0.5), 0.5);
        assert_eq!(buf.sample_at(1.5), 0.5);
        assert_eq!(buf.sample_at(2.0), 0.0);
        assert_eq!(buf.sample_at(-1.0), 0.0);
    }

    #[test]
    fn mix_to_mono_averages_frames() {
        let mut out = Vec::new();
        mix_to_mono(&[1.0, 0.0, 0.5, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn encoded_wav_decodes_to_mono() {
        let wav = wav_bytes(&[0, 16384, 16384, 0], 2, 8_000);
        let src = TrackSource::Encoded {
            data: wav,
            extension: Some("wav".into()),
        };
        let buf = decode_source(&src, 24_000).unwrap();
        assert_eq!(buf.sample_rate(), 8_000);
        assert_eq!(buf.frames(), 2);
        assert_eq!(buf.samples()[0], 0.25);
    }

    fn wav_bytes(samples: &[i16], channels: u16, rate: u32) -> Vec<u8> {
        let data = pcm_bytes(samples);
        let block_align = channels * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&data);
        out
    }
}
