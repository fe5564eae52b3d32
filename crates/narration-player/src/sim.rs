//! Deterministic output used by tests and dry runs.
//!
//! No device is opened. Time only moves when the host calls
//! [`SimHandle::advance`], and every started voice is recorded so callers can
//! check offsets, rates and how many voices are still live.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, anyhow};

use crate::decode::PcmBuffer;
use crate::error::VoiceStopped;
use crate::output::{AudioOutput, OutputState, Voice};

/// Simulated output path.
pub struct SimulatedOutput {
    shared: Arc<SimShared>,
    state: OutputState,
}

/// Clonable control handle that outlives moving the output into an engine.
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<SimShared>,
}

struct SimShared {
    clock_bits: AtomicU64,
    resume_blocked: AtomicBool,
    closed: AtomicBool,
    voices: Mutex<Vec<Arc<SimVoiceState>>>,
}

struct SimVoiceState {
    offset_secs: f64,
    started_at: f64,
    duration_secs: f64,
    rate_bits: AtomicU64,
    stopped: AtomicBool,
}

/// Point-in-time view of one started voice.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceRecord {
    /// Buffer offset the voice started from, in seconds.
    pub offset_secs: f64,
    /// Output clock when the voice was started.
    pub started_at: f64,
    /// Rate the voice is currently playing at.
    pub rate: f64,
    /// Length of the buffer the voice plays.
    pub duration_secs: f64,
    pub stopped: bool,
}

/// Voice handle returned by [`SimulatedOutput::start_voice`].
pub struct SimVoice {
    state: Arc<SimVoiceState>,
}

impl SimulatedOutput {
    /// A running output with its clock at 0.
    pub fn new() -> Self {
        Self::with_state(OutputState::Running)
    }

    /// An output that starts suspended and must be resumed before playing.
    pub fn suspended() -> Self {
        Self::with_state(OutputState::Suspended)
    }

    fn with_state(state: OutputState) -> Self {
        Self {
            shared: Arc::new(SimShared {
                clock_bits: AtomicU64::new(0f64.to_bits()),
                resume_blocked: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                voices: Mutex::new(Vec::new()),
            }),
            state,
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for SimulatedOutput {
    type Voice = SimVoice;

    fn current_time(&self) -> f64 {
        self.shared.now()
    }

    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        match self.state {
            OutputState::Closed => Err(anyhow!("output is closed")),
            OutputState::Running => Ok(()),
            OutputState::Suspended => {
                if self.shared.resume_blocked.load(Ordering::Relaxed) {
                    return Err(anyhow!("resume blocked by playback policy"));
                }
                self.state = OutputState::Running;
                Ok(())
            }
        }
    }

    fn start_voice(&mut self, buffer: &PcmBuffer, offset_secs: f64, rate: f64) -> Result<SimVoice> {
        if self.state == OutputState::Closed {
            return Err(anyhow!("output is closed"));
        }
        let state = Arc::new(SimVoiceState {
            offset_secs,
            started_at: self.shared.now(),
            duration_secs: buffer.duration_secs(),
            rate_bits: AtomicU64::new(rate.to_bits()),
            stopped: AtomicBool::new(false),
        });
        self.shared
            .voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state.clone());
        Ok(SimVoice { state })
    }

    fn close(&mut self) {
        self.state = OutputState::Closed;
        self.shared.closed.store(true, Ordering::Relaxed);
    }
}

impl Voice for SimVoice {
    fn set_rate(&self, rate: f64) {
        self.state.rate_bits.store(rate.to_bits(), Ordering::Relaxed);
    }

    fn stop(&mut self) -> Result<(), VoiceStopped> {
        if self.state.stopped.swap(true, Ordering::Relaxed) {
            return Err(VoiceStopped);
        }
        Ok(())
    }
}

impl SimShared {
    fn now(&self) -> f64 {
        f64::from_bits(self.clock_bits.load(Ordering::Relaxed))
    }
}

impl SimHandle {
    /// Move the output clock forward by `secs`.
    pub fn advance(&self, secs: f64) {
        let next = self.now() + secs.max(0.0);
        self.shared.clock_bits.store(next.to_bits(), Ordering::Relaxed);
    }

    pub fn now(&self) -> f64 {
        self.shared.now()
    }

    /// Make the next resume attempts fail, as a blocked autoplay would.
    pub fn block_resume(&self, blocked: bool) {
        self.shared.resume_blocked.store(blocked, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Relaxed)
    }

    /// Every voice started so far, oldest first.
    pub fn voices(&self) -> Vec<VoiceRecord> {
        self.shared
            .voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|v| VoiceRecord {
                offset_secs: v.offset_secs,
                started_at: v.started_at,
                rate: f64::from_bits(v.rate_bits.load(Ordering::Relaxed)),
                duration_secs: v.duration_secs,
                stopped: v.stopped.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Number of voices started and not yet stopped.
    pub fn live_voices(&self) -> usize {
        self.voices().iter().filter(|v| !v.stopped).count()
    }

    pub fn last_voice(&self) -> Option<VoiceRecord> {
        self.voices().pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(secs: usize) -> PcmBuffer {
        PcmBuffer::new(vec![0.0; secs * 100], 100)
    }

    #[test]
    fn clock_moves_only_on_advance() {
        let out = SimulatedOutput::new();
        let handle = out.handle();
        assert_eq!(out.current_time(), 0.0);
        handle.advance(1.5);
        handle.advance(-3.0);
        assert_eq!(out.current_time(), 1.5);
    }

    #[test]
    fn voices_are_logged_with_offset_and_rate() {
        let mut out = SimulatedOutput::new();
        let handle = out.handle();
        handle.advance(2.0);
        let voice = out.start_voice(&buffer(10), 4.0, 1.5).unwrap();
        voice.set_rate(2.0);
        let rec = handle.last_voice().unwrap();
        assert_eq!(rec.offset_secs, 4.0);
        assert_eq!(rec.started_at, 2.0);
        assert_eq!(rec.rate, 2.0);
        assert_eq!(rec.duration_secs, 10.0);
        assert_eq!(handle.live_voices(), 1);
    }

    #[test]
    fn second_stop_reports_voice_stopped() {
        let mut out = SimulatedOutput::new();
        let mut voice = out.start_voice(&buffer(1), 0.0, 1.0).unwrap();
        assert!(voice.stop().is_ok());
        assert_eq!(voice.stop(), Err(VoiceStopped));
        assert_eq!(out.handle().live_voices(), 0);
    }

    #[test]
    fn suspended_output_resumes_unless_blocked() {
        let mut out = SimulatedOutput::suspended();
        out.handle().block_resume(true);
        assert!(out.resume().is_err());
        assert_eq!(out.state(), OutputState::Suspended);
        out.handle().block_resume(false);
        out.resume().unwrap();
        assert_eq!(out.state(), OutputState::Running);
    }

    #[test]
    fn closed_output_refuses_voices() {
        let mut out = SimulatedOutput::new();
        out.close();
        assert!(out.handle().is_closed());
        assert!(out.start_voice(&buffer(1), 0.0, 1.0).is_err());
        assert!(out.resume().is_err());
    }

    #[test]
    fn voice_log_survives_a_poisoned_lock() {
        let mut out = SimulatedOutput::new();
        let handle = out.handle();
        let shared = Arc::clone(&out.shared);
        let poisoner = std::thread::spawn(move || {
            let _guard = shared.voices.lock().unwrap();
            panic!("poisoning voice log");
        });
        assert!(poisoner.join().is_err());
        assert!(out.shared.voices.is_poisoned());

        out.start_voice(&buffer(1), 0.0, 1.0).unwrap();
        assert_eq!(handle.voices().len(), 1);
        assert_eq!(handle.live_voices(), 1);
    }
}
