//! Play one track to the end without a terminal UI.

use std::time::Duration;

use anyhow::{Context, Result, bail};

use narration_player::output::AudioOutput;
use narration_player::{PlaybackEngine, ProgressReporter};
use narration_types::AudioTrack;

const FRAME: Duration = Duration::from_millis(33);
/// Seconds of track time between progress log lines.
const LOG_EVERY_SECS: u64 = 5;

pub(crate) fn run<O: AudioOutput>(
    engine: PlaybackEngine<O>,
    track: AudioTrack,
    on_frame: impl FnMut(),
) -> Result<()> {
    play_to_end(engine, track, on_frame, || std::thread::sleep(FRAME))
}

/// Load `track`, then tick until it ends. `wait` runs between frames.
fn play_to_end<O: AudioOutput>(
    mut engine: PlaybackEngine<O>,
    track: AudioTrack,
    mut on_frame: impl FnMut(),
    mut wait: impl FnMut(),
) -> Result<()> {
    let title = track.title.clone();
    engine.load_track(track).context("load track")?;
    if !engine.is_playing() {
        bail!("audio output did not start");
    }
    tracing::info!(%title, duration_secs = engine.duration(), "playing");

    let mut reporter = ProgressReporter::new();
    let mut logged_at: Option<u64> = None;
    loop {
        on_frame();
        let Some(update) = reporter.tick(&mut engine) else {
            break;
        };
        if update.ended {
            tracing::info!(%title, "finished");
            break;
        }
        let bucket = update.current_time as u64 / LOG_EVERY_SECS;
        if logged_at != Some(bucket) {
            logged_at = Some(bucket);
            tracing::info!(
                current = %format!("{:.1}", update.current_time),
                percent = %format!("{:.0}", update.progress_percent),
                "progress"
            );
        }
        wait();
    }
    engine.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use narration_player::PlayerConfig;
    use narration_player::sim::SimulatedOutput;
    use narration_types::TrackSource;

    fn track(secs: usize) -> AudioTrack {
        AudioTrack {
            id: "t".into(),
            title: "T".into(),
            author: "A".into(),
            src: TrackSource::RawPcm {
                data: vec![0u8; secs * 24_000 * 2],
            },
            duration: None,
        }
    }

    #[test]
    fn runs_until_the_track_ends() {
        let output = SimulatedOutput::new();
        let clock = output.handle();
        let engine = PlaybackEngine::new(output, PlayerConfig::default());
        let mut frames = 0;
        let stepper = clock.clone();
        play_to_end(engine, track(3), || stepper.advance(0.5), || frames += 1).unwrap();
        assert_eq!(frames, 5);
        assert!(clock.is_closed());
    }

    #[test]
    fn blocked_output_is_an_error() {
        let output = SimulatedOutput::suspended();
        output.handle().block_resume(true);
        let engine = PlaybackEngine::new(output, PlayerConfig::default());
        assert!(play_to_end(engine, track(1), || {}, || {}).is_err());
    }

    #[test]
    fn undecodable_track_is_an_error() {
        let engine = PlaybackEngine::new(SimulatedOutput::new(), PlayerConfig::default());
        let bad = AudioTrack {
            src: TrackSource::RawPcm { data: vec![0] },
            ..track(1)
        };
        assert!(play_to_end(engine, bad, || {}, || {}).is_err());
    }
}
