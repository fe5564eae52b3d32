use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "narrator", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match
    #[arg(long)]
    pub device: Option<String>,

    /// TOML config file ([player], [output], [speech] tables)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of the in-app log pane
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Play without opening an audio device; the clock follows wall time
    #[arg(long)]
    pub dry_run: bool,

    /// Play to the end without the terminal UI, logging progress
    #[arg(long)]
    pub headless: bool,

    /// Track title shown in the player and media session
    #[arg(long)]
    pub title: Option<String>,

    /// Track author shown in the player and media session
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a narration file (.pcm raw, .b64/.txt base64 PCM, or any container Symphonia reads)
    Play {
        path: PathBuf,
    },

    /// Synthesize `text` with the speech service and play the result
    Say {
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_play_with_flags() {
        let args = Args::try_parse_from([
            "narrator",
            "--dry-run",
            "--device",
            "usb",
            "--title",
            "Chapter 1",
            "play",
            "notes.b64",
        ])
        .unwrap();
        assert!(args.dry_run);
        assert_eq!(args.device.as_deref(), Some("usb"));
        assert_eq!(args.title.as_deref(), Some("Chapter 1"));
        match args.cmd {
            Some(Command::Play { path }) => assert_eq!(path, PathBuf::from("notes.b64")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_devices_needs_no_subcommand() {
        let args = Args::try_parse_from(["narrator", "--list-devices"]).unwrap();
        assert!(args.list_devices);
        assert!(args.cmd.is_none());
    }

    #[test]
    fn say_takes_text() {
        let args = Args::try_parse_from(["narrator", "say", "hello there"]).unwrap();
        assert!(matches!(args.cmd, Some(Command::Say { text }) if text == "hello there"));
    }
}
