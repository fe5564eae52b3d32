//! Frame-driven progress reporting.
//!
//! The host calls [`ProgressReporter::tick`] once per rendered frame. While the
//! engine plays, each tick derives the position from the output clock and
//! publishes it; when the position reaches the end of the track the reporter
//! commits end-of-track on the engine and stops polling. While paused a tick
//! is a cheap no-op.

use narration_types::ProgressUpdate;

use crate::engine::PlaybackEngine;
use crate::output::AudioOutput;

#[derive(Debug, Default)]
pub struct ProgressReporter {
    generation: Option<u64>,
    last: Option<ProgressUpdate>,
    polling: bool,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll the engine for one frame.
    ///
    /// Returns the update to publish, or `None` when the engine is not playing.
    pub fn tick<O: AudioOutput>(&mut self, engine: &mut PlaybackEngine<O>) -> Option<ProgressUpdate> {
        let generation = engine.generation();
        if self.generation != Some(generation) {
            self.generation = Some(generation);
            self.last = None;
        }

        if !engine.is_playing() {
            self.polling = false;
            return None;
        }
        self.polling = true;

        let duration = engine.duration();
        let current = engine.current_time();
        let update = if current >= duration {
            engine.finish_track();
            self.polling = false;
            ProgressUpdate::new(duration, duration, true)
        } else {
            ProgressUpdate::new(current, duration, false)
        };
        self.last = Some(update);
        Some(update)
    }

    /// Whether the last tick found the engine playing.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Most recent update for the current generation.
    pub fn last(&self) -> Option<ProgressUpdate> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::sim::SimulatedOutput;
    use narration_types::{AudioTrack, PlaybackPhase, TrackSource};

    fn track(id: &str, secs: usize) -> AudioTrack {
        AudioTrack {
            id: id.into(),
            title: id.into(),
            author: "narrator".into(),
            src: TrackSource::RawPcm {
                data: vec![0u8; secs * 24_000 * 2],
            },
            duration: None,
        }
    }

    #[test]
    fn idle_engine_is_not_polled() {
        let mut engine = PlaybackEngine::new(SimulatedOutput::new(), PlayerConfig::default());
        let mut reporter = ProgressReporter::new();
        assert!(reporter.tick(&mut engine).is_none());
        assert!(!reporter.is_polling());
    }

    #[test]
    fn reports_position_then_final_update() {
        let out = SimulatedOutput::new();
        let clock = out.handle();
        let mut engine = PlaybackEngine::new(out, PlayerConfig::default());
        let mut reporter = ProgressReporter::new();
        engine.load_track(track("a", 4)).unwrap();

        clock.advance(1.0);
        let update = reporter.tick(&mut engine).unwrap();
        assert_eq!(update.current_time, 1.0);
        assert_eq!(update.progress_percent, 25.0);
        assert!(!update.ended);
        assert!(reporter.is_polling());

        clock.advance(5.0);
        let last = reporter.tick(&mut engine).unwrap();
        assert!(last.ended);
        assert_eq!(last.current_time, 4.0);
        assert_eq!(last.progress_percent, 100.0);
        assert!(!reporter.is_polling());
        assert_eq!(engine.phase(), PlaybackPhase::Ended);
        assert!(reporter.tick(&mut engine).is_none());
    }

    #[test]
    fn paused_tick_does_no_work_until_play() {
        let out = SimulatedOutput::new();
        let clock = out.handle();
        let mut engine = PlaybackEngine::new(out, PlayerConfig::default());
        let mut reporter = ProgressReporter::new();
        engine.load_track(track("a", 10)).unwrap();
        clock.advance(2.0);
        reporter.tick(&mut engine);
        engine.pause();

        clock.advance(3.0);
        assert!(reporter.tick(&mut engine).is_none());
        assert!(!reporter.is_polling());
        assert_eq!(reporter.last().unwrap().current_time, 2.0);

        engine.play().unwrap();
        clock.advance(1.0);
        let update = reporter.tick(&mut engine).unwrap();
        assert_eq!(update.current_time, 3.0);
        assert!(reporter.is_polling());
    }

    #[test]
    fn new_generation_drops_last_value() {
        let out = SimulatedOutput::new();
        let clock = out.handle();
        let mut engine = PlaybackEngine::new(out, PlayerConfig::default());
        let mut reporter = ProgressReporter::new();
        engine.load_track(track("a", 10)).unwrap();
        clock.advance(2.0);
        reporter.tick(&mut engine);
        assert!(reporter.last().is_some());

        let _pending = engine.begin_load(track("b", 10));
        assert!(reporter.tick(&mut engine).is_none());
        assert!(reporter.last().is_none());
    }
}
