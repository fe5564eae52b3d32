//! Narration playback engine.
//!
//! Owns one shared [`AudioOutput`] and at most one playback session. Playback
//! is built from start-once voices: every `play` starts a fresh voice at the
//! logical elapsed position, every `pause` stops it and commits the time
//! rendered since the last anchor.
//!
//! Loads are tagged with a generation counter so a decode that finishes after
//! a newer load (or a close) is discarded instead of clobbering the session.

use narration_types::{
    AudioTrack, MediaAction, MediaPlaybackState, NowPlaying, PlaybackEndReason, PlaybackPhase,
    PlaybackSnapshot, progress_percent,
};

use crate::config::PlayerConfig;
use crate::decode::{PcmBuffer, decode_source};
use crate::error::{DecodeError, PlayerError};
use crate::media_session::{MediaSession, NullMediaSession, TRANSPORT_ACTIONS};
use crate::output::{AudioOutput, OutputState, Voice};

/// Playback rates cycled by [`PlaybackEngine::change_speed`].
pub const PLAYBACK_RATES: [f64; 3] = [1.0, 1.5, 2.0];

/// A load that has been accepted and is waiting for its decode.
///
/// Can be moved to a worker thread; hand the [`DecodedLoad`] back to
/// [`PlaybackEngine::complete_load`].
#[derive(Debug)]
pub struct PendingLoad {
    generation: u64,
    track: AudioTrack,
    contract_rate: u32,
}

/// Decode outcome tagged with the generation that requested it.
#[derive(Debug)]
pub struct DecodedLoad {
    pub generation: u64,
    pub track_id: String,
    pub result: Result<PcmBuffer, DecodeError>,
}

impl PendingLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decode the track payload. Blocking; safe to call off the engine thread.
    pub fn decode(self) -> DecodedLoad {
        let result = decode_source(&self.track.src, self.contract_rate);
        DecodedLoad {
            generation: self.generation,
            track_id: self.track.id,
            result,
        }
    }
}

/// Single-threaded playback controller.
pub struct PlaybackEngine<O: AudioOutput> {
    config: PlayerConfig,
    output: O,
    media: Box<dyn MediaSession>,
    track: Option<AudioTrack>,
    buffer: Option<PcmBuffer>,
    voice: Option<O::Voice>,
    phase: PlaybackPhase,
    is_playing: bool,
    rate: f64,
    /// Track position committed at the last pause/seek/rate change.
    elapsed: f64,
    /// Output clock at which the running voice was (re)anchored.
    anchor: Option<f64>,
    duration: f64,
    generation: u64,
    end_reason: Option<PlaybackEndReason>,
    disposed: bool,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    pub fn new(output: O, config: PlayerConfig) -> Self {
        Self::with_media_session(output, config, Box::new(NullMediaSession))
    }

    pub fn with_media_session(
        output: O,
        config: PlayerConfig,
        media: Box<dyn MediaSession>,
    ) -> Self {
        Self {
            config,
            output,
            media,
            track: None,
            buffer: None,
            voice: None,
            phase: PlaybackPhase::Empty,
            is_playing: false,
            rate: PLAYBACK_RATES[0],
            elapsed: 0.0,
            anchor: None,
            duration: 0.0,
            generation: 0,
            end_reason: None,
            disposed: false,
        }
    }

    /// Load, decode and auto-play `track` on the calling thread.
    pub fn load_track(&mut self, track: AudioTrack) -> Result<(), PlayerError> {
        let pending = self.begin_load(track);
        let decoded = pending.decode();
        self.complete_load(decoded)
    }

    /// Replace the session with `track` and hand back its pending decode.
    ///
    /// Stops any running voice, resets position, publishes the new metadata
    /// and invalidates every earlier pending load.
    pub fn begin_load(&mut self, track: AudioTrack) -> PendingLoad {
        self.stop_voice();
        self.generation += 1;
        self.is_playing = false;
        self.anchor = None;
        self.elapsed = 0.0;
        self.buffer = None;
        self.duration = track
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0);
        self.phase = PlaybackPhase::Loading;
        self.end_reason = None;

        let now_playing = NowPlaying {
            title: track.title.clone(),
            author: track.author.clone(),
            album: self.config.album_label.clone(),
            artwork_url: self.config.artwork_url.clone(),
        };
        self.media.set_metadata(&now_playing);
        self.media.register_handlers(&TRANSPORT_ACTIONS);
        self.media.set_playback_state(MediaPlaybackState::Paused);

        tracing::info!(
            generation = self.generation,
            track_id = %track.id,
            source = track.src.kind(),
            bytes = track.src.len(),
            "load started"
        );
        self.track = Some(track.clone());
        PendingLoad {
            generation: self.generation,
            track,
            contract_rate: self.config.contract_sample_rate,
        }
    }

    /// Install a finished decode and auto-play it.
    ///
    /// Returns [`PlayerError::StaleGeneration`] when a newer load or a close
    /// happened since the decode was requested; callers drop that silently.
    /// A blocked output during auto-play leaves the track loaded and paused.
    pub fn complete_load(&mut self, loaded: DecodedLoad) -> Result<(), PlayerError> {
        if loaded.generation != self.generation {
            tracing::debug!(
                generation = loaded.generation,
                current = self.generation,
                track_id = %loaded.track_id,
                "discarding stale decode"
            );
            return Err(PlayerError::StaleGeneration {
                generation: loaded.generation,
                current: self.generation,
            });
        }

        let buffer = match loaded.result {
            Ok(buffer) => buffer,
            Err(err) => {
                tracing::warn!(
                    generation = loaded.generation,
                    track_id = %loaded.track_id,
                    "decode failed: {err}"
                );
                self.track = None;
                self.buffer = None;
                self.duration = 0.0;
                self.elapsed = 0.0;
                self.phase = PlaybackPhase::Empty;
                self.end_reason = Some(PlaybackEndReason::Error);
                self.media.set_playback_state(MediaPlaybackState::None);
                self.media.unregister_handlers();
                self.media.clear_metadata();
                return Err(err.into());
            }
        };

        self.duration = buffer.duration_secs();
        self.buffer = Some(buffer);
        self.phase = PlaybackPhase::Paused;
        tracing::info!(
            generation = self.generation,
            track_id = %loaded.track_id,
            duration_secs = self.duration,
            "track loaded"
        );

        match self.play() {
            Err(PlayerError::ResourceUnavailable(reason)) => {
                tracing::warn!(%reason, "auto-play blocked; track left paused");
                Ok(())
            }
            other => other,
        }
    }

    /// Start playback from the logical position.
    ///
    /// No-op without a decoded buffer or while already playing. Playing from
    /// the end of the track restarts it.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        let Some(buffer) = self.buffer.clone() else {
            return Ok(());
        };
        if self.is_playing {
            return Ok(());
        }

        if self.output.state() == OutputState::Suspended {
            self.output
                .resume()
                .map_err(|e| PlayerError::ResourceUnavailable(format!("{e:#}")))?;
        }

        let offset = if self.elapsed >= self.duration {
            0.0
        } else {
            self.elapsed
        };
        self.stop_voice();
        let voice = self
            .output
            .start_voice(&buffer, offset, self.rate)
            .map_err(|e| PlayerError::ResourceUnavailable(format!("{e:#}")))?;

        self.voice = Some(voice);
        self.elapsed = offset;
        self.anchor = Some(self.output.current_time());
        self.is_playing = true;
        self.phase = PlaybackPhase::Playing;
        self.end_reason = None;
        self.media.set_playback_state(MediaPlaybackState::Playing);
        tracing::debug!(offset_secs = offset, rate = self.rate, "playback started");
        Ok(())
    }

    /// Stop the running voice and commit the elapsed time. No-op when paused.
    pub fn pause(&mut self) {
        if !self.is_playing {
            return;
        }
        let elapsed = self.live_elapsed(self.output.current_time());
        self.stop_voice();
        self.elapsed = elapsed;
        self.anchor = None;
        self.is_playing = false;
        if elapsed >= self.duration {
            self.phase = PlaybackPhase::Ended;
            self.end_reason = Some(PlaybackEndReason::Eof);
        } else {
            self.phase = PlaybackPhase::Paused;
        }
        self.media.set_playback_state(MediaPlaybackState::Paused);
        tracing::debug!(elapsed_secs = elapsed, "playback paused");
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlayerError> {
        if self.is_playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Move the position by `delta` seconds, clamped to the track.
    ///
    /// A running track keeps playing from the new position; seeking a running
    /// track to its end finishes it.
    pub fn seek_by(&mut self, delta: f64) -> Result<(), PlayerError> {
        if self.buffer.is_none() || !delta.is_finite() {
            return Ok(());
        }
        let was_playing = self.is_playing;
        if was_playing {
            self.pause();
        }
        let target = (self.elapsed + delta).clamp(0.0, self.duration);
        self.elapsed = target;
        tracing::debug!(delta, target_secs = target, "seek");

        if target >= self.duration {
            if was_playing {
                self.phase = PlaybackPhase::Ended;
                self.end_reason = Some(PlaybackEndReason::Eof);
            }
            return Ok(());
        }
        if self.phase == PlaybackPhase::Ended {
            self.phase = PlaybackPhase::Paused;
            self.end_reason = None;
        }
        if was_playing {
            self.play()?;
        }
        Ok(())
    }

    /// Advance the rate through 1.0, 1.5, 2.0 and back; returns the new rate.
    ///
    /// A running voice switches in place. Time played at the old rate is
    /// committed first so the reported position stays continuous.
    pub fn change_speed(&mut self) -> f64 {
        let next = next_rate(self.rate);
        if self.is_playing {
            let now = self.output.current_time();
            self.elapsed = self.live_elapsed(now);
            self.anchor = Some(now);
            if let Some(voice) = &self.voice {
                voice.set_rate(next);
            }
        }
        self.rate = next;
        tracing::info!(rate = next, "playback rate changed");
        next
    }

    /// Stop playback and rewind to 0, keeping the loaded track. Idempotent.
    pub fn stop(&mut self) {
        self.stop_voice();
        self.is_playing = false;
        self.anchor = None;
        self.elapsed = 0.0;
        match self.phase {
            PlaybackPhase::Playing | PlaybackPhase::Ended => self.phase = PlaybackPhase::Paused,
            PlaybackPhase::Empty | PlaybackPhase::Loading | PlaybackPhase::Paused => {}
        }
        if self.track.is_some() {
            self.end_reason = Some(PlaybackEndReason::Stopped);
            self.media.set_playback_state(MediaPlaybackState::Paused);
        }
    }

    /// Stop and discard the session. Pending loads become stale. Idempotent.
    pub fn close_player(&mut self) {
        self.stop();
        if let Some(track) = self.track.take() {
            self.generation += 1;
            tracing::info!(track_id = %track.id, "player closed");
            self.media.set_playback_state(MediaPlaybackState::None);
            self.media.unregister_handlers();
            self.media.clear_metadata();
        }
        self.buffer = None;
        self.duration = 0.0;
        self.phase = PlaybackPhase::Empty;
    }

    /// Dispatch a platform media action.
    pub fn handle_media_action(&mut self, action: MediaAction) -> Result<(), PlayerError> {
        tracing::debug!(?action, "media action");
        match action {
            MediaAction::Play => self.play(),
            MediaAction::Pause => {
                self.pause();
                Ok(())
            }
            MediaAction::TogglePlayPause => self.toggle_play_pause(),
            MediaAction::SeekBackward => self.seek_by(-self.config.seek_step_seconds),
            MediaAction::SeekForward => self.seek_by(self.config.seek_step_seconds),
        }
    }

    /// Commit end-of-track. Only applies while playing; returns whether it did.
    pub fn finish_track(&mut self) -> bool {
        if !self.is_playing {
            return false;
        }
        self.stop_voice();
        self.elapsed = self.duration;
        self.anchor = None;
        self.is_playing = false;
        self.phase = PlaybackPhase::Ended;
        self.end_reason = Some(PlaybackEndReason::Eof);
        self.media.set_playback_state(MediaPlaybackState::Paused);
        tracing::info!(generation = self.generation, "track finished");
        true
    }

    /// Track position in seconds, live while playing.
    pub fn current_time(&self) -> f64 {
        if self.is_playing {
            self.live_elapsed(self.output.current_time())
        } else {
            self.elapsed
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_track(&self) -> Option<&AudioTrack> {
        self.track.as_ref()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let current_time = self.current_time();
        PlaybackSnapshot {
            phase: self.phase,
            track_id: self.track.as_ref().map(|t| t.id.clone()),
            title: self.track.as_ref().map(|t| t.title.clone()),
            author: self.track.as_ref().map(|t| t.author.clone()),
            is_playing: self.is_playing,
            playback_rate: self.rate,
            current_time,
            duration: self.duration,
            progress_percent: progress_percent(current_time, self.duration),
            generation: self.generation,
            end_reason: self.end_reason,
        }
    }

    /// Close the session, deregister media handlers and release the output.
    pub fn dispose(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.close_player();
        self.media.unregister_handlers();
        self.output.close();
        tracing::debug!("engine disposed");
    }

    fn live_elapsed(&self, now: f64) -> f64 {
        let since_anchor = self.anchor.map(|a| (now - a).max(0.0)).unwrap_or(0.0);
        (self.elapsed + since_anchor * self.rate).clamp(0.0, self.duration)
    }

    fn stop_voice(&mut self) {
        if let Some(mut voice) = self.voice.take() {
            if let Err(e) = voice.stop() {
                tracing::trace!("ignoring stop on finished voice: {e}");
            }
        }
    }
}

impl<O: AudioOutput> Drop for PlaybackEngine<O> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn next_rate(current: f64) -> f64 {
    PLAYBACK_RATES
        .iter()
        .position(|r| *r == current)
        .map(|i| PLAYBACK_RATES[(i + 1) % PLAYBACK_RATES.len()])
        .unwrap_or(PLAYBACK_RATES[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedOutput;
    use narration_types::TrackSource;

    fn track(secs: usize) -> AudioTrack {
        let bytes = vec![0u8; secs * 24_000 * 2];
        AudioTrack {
            id: "t".into(),
            title: "Title".into(),
            author: "Author".into(),
            src: TrackSource::RawPcm { data: bytes },
            duration: None,
        }
    }

    #[test]
    fn next_rate_cycles_and_recovers() {
        assert_eq!(next_rate(1.0), 1.5);
        assert_eq!(next_rate(1.5), 2.0);
        assert_eq!(next_rate(2.0), 1.0);
        assert_eq!(next_rate(0.75), 1.0);
    }

    #[test]
    fn live_elapsed_scales_by_rate_and_clamps() {
        let out = SimulatedOutput::new();
        let clock = out.handle();
        let mut engine = PlaybackEngine::new(out, PlayerConfig::default());
        engine.load_track(track(10)).unwrap();
        engine.change_speed();
        clock.advance(2.0);
        assert_eq!(engine.current_time(), 3.0);
        clock.advance(100.0);
        assert_eq!(engine.current_time(), 10.0);
    }

    #[test]
    fn duration_hint_shows_while_loading() {
        let mut engine = PlaybackEngine::new(SimulatedOutput::new(), PlayerConfig::default());
        let mut t = track(1);
        t.duration = Some(42.0);
        let pending = engine.begin_load(t);
        assert_eq!(engine.phase(), PlaybackPhase::Loading);
        assert_eq!(engine.duration(), 42.0);
        engine.complete_load(pending.decode()).unwrap();
        assert_eq!(engine.duration(), 1.0);
    }

    #[test]
    fn dispose_closes_output() {
        let out = SimulatedOutput::new();
        let handle = out.handle();
        let mut engine = PlaybackEngine::new(out, PlayerConfig::default());
        engine.load_track(track(1)).unwrap();
        engine.dispose();
        assert!(handle.is_closed());
        assert_eq!(handle.live_voices(), 0);
    }
}
