//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use narration_player::sim::{SimHandle, SimulatedOutput};
use narration_player::{PlaybackEngine, PlayerConfig};
use narration_player::media_session::MediaSession;
use narration_types::{AudioTrack, MediaAction, MediaPlaybackState, NowPlaying, TrackSource};

pub const RATE: u32 = 24_000;

/// Silent raw PCM track of `secs` seconds at the contract rate.
pub fn track(id: &str, secs: f64) -> AudioTrack {
    let frames = (secs * RATE as f64).round() as usize;
    AudioTrack {
        id: id.to_string(),
        title: format!("Title {id}"),
        author: format!("Author {id}"),
        src: TrackSource::RawPcm {
            data: vec![0u8; frames * 2],
        },
        duration: None,
    }
}

/// Track whose payload cannot be decoded.
pub fn broken_track(id: &str) -> AudioTrack {
    AudioTrack {
        id: id.to_string(),
        title: format!("Title {id}"),
        author: format!("Author {id}"),
        src: TrackSource::Base64Pcm {
            data: "%%% not base64 %%%".to_string(),
        },
        duration: None,
    }
}

pub fn engine() -> (PlaybackEngine<SimulatedOutput>, SimHandle) {
    let out = SimulatedOutput::new();
    let handle = out.handle();
    (PlaybackEngine::new(out, PlayerConfig::default()), handle)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// Everything the engine published to its media session.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaEvent {
    Registered(Vec<MediaAction>),
    Unregistered,
    Metadata(NowPlaying),
    MetadataCleared,
    State(MediaPlaybackState),
}

#[derive(Clone, Default)]
pub struct RecordingSession {
    events: Arc<Mutex<Vec<MediaEvent>>>,
}

impl RecordingSession {
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_state(&self) -> Option<MediaPlaybackState> {
        self.events().into_iter().rev().find_map(|e| match e {
            MediaEvent::State(s) => Some(s),
            _ => None,
        })
    }

    pub fn metadata(&self) -> Vec<NowPlaying> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MediaEvent::Metadata(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: MediaEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl MediaSession for RecordingSession {
    fn register_handlers(&mut self, actions: &[MediaAction]) {
        self.push(MediaEvent::Registered(actions.to_vec()));
    }

    fn unregister_handlers(&mut self) {
        self.push(MediaEvent::Unregistered);
    }

    fn set_metadata(&mut self, now_playing: &NowPlaying) {
        self.push(MediaEvent::Metadata(now_playing.clone()));
    }

    fn clear_metadata(&mut self) {
        self.push(MediaEvent::MetadataCleared);
    }

    fn set_playback_state(&mut self, state: MediaPlaybackState) {
        self.push(MediaEvent::State(state));
    }
}
