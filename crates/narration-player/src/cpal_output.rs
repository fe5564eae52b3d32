//! CPAL-backed output path.
//!
//! One output stream is opened when the output is created and kept for the
//! lifetime of the engine. The real-time callback:
//! - renders the single active voice with linear interpolation at its current rate
//! - fans mono samples out to every device channel
//! - converts `f32` samples to the device sample format
//! - counts emitted frames, which is the output clock
//!
//! Suspending pauses the stream, so the clock stops with it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, StreamTrait};

use crate::config::OutputConfig;
use crate::decode::PcmBuffer;
use crate::device;
use crate::error::VoiceStopped;
use crate::output::{AudioOutput, OutputState, Voice};

const DEFAULT_BUFFER_FRAMES_MAX: u32 = 4_096;

/// Output path that renders voices on a CPAL device.
pub struct CpalOutput {
    stream: Option<cpal::Stream>,
    shared: Arc<CallbackShared>,
    sample_rate: u32,
    channels: u16,
    device_name: String,
    state: OutputState,
}

/// State shared between the engine thread and the audio callback.
struct CallbackShared {
    played_frames: AtomicU64,
    slot: Mutex<Option<ActiveVoice>>,
}

struct ActiveVoice {
    control: Arc<VoiceControl>,
    buffer: PcmBuffer,
    /// Fractional read position in source frames.
    pos: f64,
}

struct VoiceControl {
    rate_bits: AtomicU64,
    stopped: AtomicBool,
}

/// Voice handle returned by [`CpalOutput::start_voice`].
pub struct CpalVoice {
    control: Arc<VoiceControl>,
}

impl CpalOutput {
    /// Open the configured device and start its stream.
    ///
    /// `contract_rate` is the preferred device rate when the config sets none.
    pub fn open(cfg: &OutputConfig, contract_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, cfg.device.as_deref())?;
        let device_name = device
            .description()
            .map(|d| d.name().to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());

        let target_rate = cfg.target_rate.unwrap_or(contract_rate);
        let supported = device::pick_output_config(&device, target_rate)
            .with_context(|| format!("choose output config for {device_name}"))?;
        let sample_format = supported.sample_format();
        let mut stream_config: cpal::StreamConfig = supported.config();
        let buffer_cap = cfg.buffer_frames_max.unwrap_or(DEFAULT_BUFFER_FRAMES_MAX);
        if let Some(size) = device::pick_buffer_size(&supported, buffer_cap) {
            stream_config.buffer_size = size;
        }

        let shared = Arc::new(CallbackShared {
            played_frames: AtomicU64::new(0),
            slot: Mutex::new(None),
        });
        let stream = build_output_stream(&device, &stream_config, sample_format, &shared)?;
        let state = match stream.play() {
            Ok(()) => OutputState::Running,
            Err(e) => {
                tracing::warn!("output stream did not start: {e}");
                OutputState::Suspended
            }
        };

        tracing::info!(
            device = %device_name,
            rate_hz = stream_config.sample_rate,
            channels = stream_config.channels,
            format = ?sample_format,
            buffer = ?stream_config.buffer_size,
            "output opened"
        );

        Ok(Self {
            stream: Some(stream),
            shared,
            sample_rate: stream_config.sample_rate,
            channels: stream_config.channels,
            device_name,
            state,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl AudioOutput for CpalOutput {
    type Voice = CpalVoice;

    fn current_time(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.shared.played_frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        match (&self.stream, self.state) {
            (None, _) | (_, OutputState::Closed) => Err(anyhow!("output is closed")),
            (Some(_), OutputState::Running) => Ok(()),
            (Some(stream), OutputState::Suspended) => {
                stream.play().context("resume output stream")?;
                self.state = OutputState::Running;
                tracing::debug!("output resumed");
                Ok(())
            }
        }
    }

    fn start_voice(&mut self, buffer: &PcmBuffer, offset_secs: f64, rate: f64) -> Result<CpalVoice> {
        if self.state == OutputState::Closed {
            return Err(anyhow!("output is closed"));
        }
        let control = Arc::new(VoiceControl {
            rate_bits: AtomicU64::new(rate.to_bits()),
            stopped: AtomicBool::new(false),
        });
        let pos = (offset_secs.max(0.0) * buffer.sample_rate() as f64).min(buffer.frames() as f64);
        let mut slot = self
            .shared
            .slot
            .lock()
            .map_err(|_| anyhow!("output voice slot poisoned"))?;
        *slot = Some(ActiveVoice {
            control: control.clone(),
            buffer: buffer.clone(),
            pos,
        });
        Ok(CpalVoice { control })
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::debug!("pause on close failed: {e}");
            }
        }
        if let Ok(mut slot) = self.shared.slot.lock() {
            *slot = None;
        }
        self.state = OutputState::Closed;
        tracing::info!(device = %self.device_name, "output closed");
    }
}

impl Voice for CpalVoice {
    fn set_rate(&self, rate: f64) {
        self.control.rate_bits.store(rate.to_bits(), Ordering::Relaxed);
    }

    fn stop(&mut self) -> Result<(), VoiceStopped> {
        if self.control.stopped.swap(true, Ordering::Relaxed) {
            return Err(VoiceStopped);
        }
        Ok(())
    }
}

fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    shared: &Arc<CallbackShared>,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, shared),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, shared),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, shared),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, shared),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &Arc<CallbackShared>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = (config.channels as usize).max(1);
    let device_rate = config.sample_rate;
    let shared_cb = shared.clone();
    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let frames = data.len() / channels_out;
            let mut slot = shared_cb.slot.lock().unwrap();
            let finished = match slot.as_mut() {
                Some(voice) => render_voice(voice, data, channels_out, device_rate),
                None => {
                    data.fill(<T as cpal::Sample>::from_sample::<f32>(0.0));
                    false
                }
            };
            if finished {
                *slot = None;
            }
            drop(slot);
            shared_cb
                .played_frames
                .fetch_add(frames as u64, Ordering::Relaxed);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Fill `data` from `voice`, returning `true` when the voice can be dropped.
fn render_voice<T>(voice: &mut ActiveVoice, data: &mut [T], channels: usize, device_rate: u32) -> bool
where
    T: cpal::Sample + cpal::FromSample<f32>,
{
    let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);
    if voice.control.stopped.load(Ordering::Relaxed) {
        data.fill(silence);
        return true;
    }

    let rate = f64::from_bits(voice.control.rate_bits.load(Ordering::Relaxed));
    let step = source_step(rate, voice.buffer.sample_rate(), device_rate);
    let end = voice.buffer.frames() as f64;

    for frame in data.chunks_mut(channels) {
        if voice.pos >= end {
            frame.fill(silence);
            continue;
        }
        let sample = <T as cpal::Sample>::from_sample::<f32>(voice.buffer.sample_at(voice.pos));
        frame.fill(sample);
        voice.pos += step;
    }

    voice.pos >= end
}

/// Source frames consumed per device frame.
fn source_step(rate: f64, source_rate: u32, device_rate: u32) -> f64 {
    if device_rate == 0 {
        return 0.0;
    }
    rate.max(0.0) * source_rate as f64 / device_rate as f64
}
