//! Output device discovery and selection.
//!
//! Thin wrappers around CPAL for:
//! - listing output devices for `--list-devices`
//! - selecting either the default device or a device by substring match
//! - choosing a stream config close to the narration sample rate

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Pick the first output device whose name contains `needle` (case-insensitive),
/// or the host default device when `needle` is `None`.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    if let Some(needle) = needle {
        let mut devices = host.output_devices().context("No output devices")?;
        return devices
            .find(|d| {
                d.description()
                    .ok()
                    .map(|n| matches_device_name(&n.name(), needle))
                    .unwrap_or(false)
            })
            .ok_or_else(|| anyhow!("No output device matched: {needle}"));
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("No default output device"))
}

/// Choose the supported output config nearest to `target_rate`.
///
/// Narration is low-rate speech, so the smallest supported rate at or above the
/// target wins over higher ones; a rate below the target is only used when the
/// device offers nothing higher. Ties go to the better sample format.
pub fn pick_output_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<cpal::SupportedStreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> =
        device.supported_output_configs()?.collect();

    let mut best: Option<(RateScore, cpal::SupportedStreamConfig)> = None;
    for range in ranges {
        let rate = clamp_rate(range.min_sample_rate(), range.max_sample_rate(), target_rate);
        let score = RateScore::new(rate, target_rate, sample_format_rank(range.sample_format()));
        if best.as_ref().is_none_or(|(b, _)| score < *b) {
            best = Some((score, range.with_sample_rate(rate)));
        }
    }

    best.map(|(_, cfg)| cfg)
        .ok_or_else(|| anyhow!("No supported output configs"))
}

/// Prefer a fixed buffer size when the device advertises a range.
///
/// `max_frames` caps the request; `None` when only the default size is supported.
pub fn pick_buffer_size(
    config: &cpal::SupportedStreamConfig,
    max_frames: u32,
) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed(clamp_buffer_frames(*min, *max, max_frames)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Names of all output devices on `host`, in enumeration order.
pub fn list_devices(host: &cpal::Host) -> Result<Vec<String>> {
    let devices = host.output_devices().context("No output devices")?;
    let mut names = Vec::new();
    for d in devices {
        names.push(d.description()?.name().to_string());
    }
    Ok(names)
}

fn clamp_buffer_frames(min: u32, max: u32, cap: u32) -> u32 {
    if max > cap { cap.max(min) } else { max }
}

fn clamp_rate(min: u32, max: u32, target: u32) -> u32 {
    target.clamp(min, max.max(min))
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

/// Ordering key for candidate configs; smaller is better.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RateScore {
    below_target: bool,
    distance: u32,
    format_rank: u8,
}

impl RateScore {
    fn new(rate: u32, target: u32, format_rank: u8) -> Self {
        Self {
            below_target: rate < target,
            distance: rate.abs_diff(target),
            format_rank,
        }
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}
