//! Terminal stand-in for a platform media surface.
//!
//! Receives what the engine publishes (now-playing metadata, playback state,
//! handled actions) so the UI can render it and decide which media keys are live.

use std::sync::{Arc, Mutex};

use narration_player::media_session::MediaSession;
use narration_types::{MediaAction, MediaPlaybackState, NowPlaying};

#[derive(Clone, Debug)]
pub struct MediaPanelState {
    pub now_playing: Option<NowPlaying>,
    pub playback_state: MediaPlaybackState,
    pub actions: Vec<MediaAction>,
}

impl Default for MediaPanelState {
    fn default() -> Self {
        Self {
            now_playing: None,
            playback_state: MediaPlaybackState::None,
            actions: Vec::new(),
        }
    }
}

/// Shared handle: one clone goes into the engine, the other stays with the UI.
#[derive(Clone, Default)]
pub struct MediaPanel {
    inner: Arc<Mutex<MediaPanelState>>,
}

impl MediaPanel {
    pub fn view(&self) -> MediaPanelState {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Whether a key mapped to `action` should reach the engine.
    pub fn accepts(&self, action: MediaAction) -> bool {
        let Ok(state) = self.inner.lock() else {
            return false;
        };
        match action {
            MediaAction::TogglePlayPause => {
                state.actions.contains(&MediaAction::Play) || state.actions.contains(&MediaAction::Pause)
            }
            other => state.actions.contains(&other),
        }
    }

    fn update(&self, f: impl FnOnce(&mut MediaPanelState)) {
        if let Ok(mut state) = self.inner.lock() {
            f(&mut state);
        }
    }
}

impl MediaSession for MediaPanel {
    fn register_handlers(&mut self, actions: &[MediaAction]) {
        self.update(|s| s.actions = actions.to_vec());
    }

    fn unregister_handlers(&mut self) {
        self.update(|s| s.actions.clear());
    }

    fn set_metadata(&mut self, now_playing: &NowPlaying) {
        self.update(|s| s.now_playing = Some(now_playing.clone()));
    }

    fn clear_metadata(&mut self) {
        self.update(|s| s.now_playing = None);
    }

    fn set_playback_state(&mut self, state: MediaPlaybackState) {
        self.update(|s| s.playback_state = state);
    }
}
