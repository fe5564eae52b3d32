//! Platform media-session surface.
//!
//! The engine publishes now-playing metadata and playback state through a
//! [`MediaSession`], and registers the transport actions it can serve. The
//! host translates platform events (media keys, lock screen) into
//! [`MediaAction`]s and feeds them to
//! [`crate::engine::PlaybackEngine::handle_media_action`].

use narration_types::{MediaAction, MediaPlaybackState, NowPlaying};

/// Actions registered for every loaded track.
pub const TRANSPORT_ACTIONS: [MediaAction; 4] = [
    MediaAction::Play,
    MediaAction::Pause,
    MediaAction::SeekBackward,
    MediaAction::SeekForward,
];

/// Sink for media-session updates.
pub trait MediaSession {
    /// Replace the set of handled actions.
    fn register_handlers(&mut self, actions: &[MediaAction]);

    fn unregister_handlers(&mut self);

    fn set_metadata(&mut self, now_playing: &NowPlaying);

    /// Drop the now-playing metadata once no track is loaded.
    fn clear_metadata(&mut self);

    fn set_playback_state(&mut self, state: MediaPlaybackState);
}

/// Session for hosts without a media surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMediaSession;

impl MediaSession for NullMediaSession {
    fn register_handlers(&mut self, _actions: &[MediaAction]) {}

    fn unregister_handlers(&mut self) {}

    fn set_metadata(&mut self, _now_playing: &NowPlaying) {}

    fn clear_metadata(&mut self) {}

    fn set_playback_state(&mut self, _state: MediaPlaybackState) {}
}
