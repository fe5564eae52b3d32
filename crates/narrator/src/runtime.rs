//! Narrator runtime.
//!
//! Resolves configuration, builds the track to play, opens the output (CPAL or
//! simulated) and hands everything to the terminal UI or the headless loop.

use std::time::Instant;

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, unbounded};

use narration_player::cpal_output::CpalOutput;
use narration_player::output::AudioOutput;
use narration_player::sim::SimulatedOutput;
use narration_player::{PlaybackEngine, device};
use narration_types::AudioTrack;

use crate::cli::{Args, Command};
use crate::config::NarratorConfig;
use crate::logging::{self, LogTarget};
use crate::media_panel::MediaPanel;
use crate::source::{TrackLabels, track_from_file, track_from_speech};
use crate::speech::{GeminiSpeech, MISSING_KEY_MESSAGE, SpeechSynthesizer};
use crate::{headless, ui};

pub fn run(args: Args) -> Result<()> {
    let cfg = match args.config.as_deref() {
        Some(path) => NarratorConfig::load(path)?,
        None => NarratorConfig::default(),
    };

    let interactive = !args.headless && !args.list_devices;
    let (log_tx, log_rx) = unbounded();
    let log_rx = match (args.log_file.as_deref(), interactive) {
        (Some(path), _) => {
            logging::init(LogTarget::File(path))?;
            None
        }
        (None, true) => {
            logging::init(LogTarget::Pane(log_tx))?;
            Some(log_rx)
        }
        (None, false) => {
            logging::init(LogTarget::Stderr)?;
            None
        }
    };

    if args.list_devices {
        return list_devices();
    }

    let Some(cmd) = args.cmd.as_ref() else {
        bail!("nothing to play; try `narrator play <file>` or `narrator say <text>`");
    };
    let labels = TrackLabels {
        title: args.title.clone(),
        author: args.author.clone(),
    };
    let track = match cmd {
        Command::Play { path } => track_from_file(path, &labels)?,
        Command::Say { text } => {
            let Some(client) = GeminiSpeech::from_config(&cfg.speech_config()) else {
                eprintln!("{MISSING_KEY_MESSAGE}");
                return Ok(());
            };
            let src = client.synthesize(text).context("synthesize speech")?;
            track_from_speech(text, src, &labels)
        }
    };

    let player_cfg = cfg.player_config();
    let panel = MediaPanel::default();

    if args.dry_run {
        let output = SimulatedOutput::new();
        let clock = output.handle();
        let engine = PlaybackEngine::with_media_session(output, player_cfg, Box::new(panel.clone()));
        let mut last = Instant::now();
        let follow_wall_clock = move || {
            let now = Instant::now();
            clock.advance(now.duration_since(last).as_secs_f64());
            last = now;
        };
        tracing::info!("dry run: no audio device opened");
        return play(
            engine,
            panel,
            track,
            "simulated (dry run)".to_string(),
            log_rx,
            args.headless,
            follow_wall_clock,
        );
    }

    let out_cfg = cfg.output_config(args.device.as_deref());
    let output = CpalOutput::open(&out_cfg, player_cfg.contract_sample_rate)
        .context("open audio output")?;
    let label = format!(
        "{} ({} Hz, {} ch)",
        output.device_name(),
        output.sample_rate(),
        output.channels()
    );
    let engine = PlaybackEngine::with_media_session(output, player_cfg, Box::new(panel.clone()));
    play(engine, panel, track, label, log_rx, args.headless, || {})
}

fn play<O: AudioOutput>(
    engine: PlaybackEngine<O>,
    panel: MediaPanel,
    track: AudioTrack,
    output_label: String,
    log_rx: Option<Receiver<String>>,
    headless: bool,
    on_frame: impl FnMut(),
) -> Result<()> {
    if headless {
        tracing::info!(output = %output_label, "headless playback");
        headless::run(engine, track, on_frame)
    } else {
        ui::run_tui(engine, panel, track, output_label, log_rx, on_frame)
    }
}

/// Print output devices to stdout.
fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    for (i, name) in device::list_devices(&host)?.iter().enumerate() {
        println!("#{i}: {name}");
    }
    Ok(())
}
