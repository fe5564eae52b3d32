//! Build [`AudioTrack`]s from files and synthesized speech.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use anyhow::{Context, Result};

use narration_types::{AudioTrack, TrackSource};

/// Metadata supplied on the command line.
#[derive(Clone, Debug, Default)]
pub struct TrackLabels {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Read `path` and wrap it in a track.
///
/// `.pcm`/`.raw` are raw 16-bit PCM, `.b64`/`.txt` are base64 PCM, anything
/// else is handed to the container decoder with its extension as a hint.
pub fn track_from_file(path: &Path, labels: &TrackLabels) -> Result<AudioTrack> {
    let data = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let src = source_for(data, extension)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("narration")
        .to_string();
    Ok(AudioTrack {
        id: path.to_string_lossy().to_string(),
        title: labels.title.clone().unwrap_or(stem),
        author: labels.author.clone().unwrap_or_else(|| "Unknown".to_string()),
        src,
        duration: None,
    })
}

/// Wrap synthesized speech in a track titled after the text.
pub fn track_from_speech(text: &str, src: TrackSource, labels: &TrackLabels) -> AudioTrack {
    AudioTrack {
        id: format!("speech-{}", hash_bytes(text.as_bytes())),
        title: labels
            .title
            .clone()
            .unwrap_or_else(|| title_from_text(text, 48)),
        author: labels
            .author
            .clone()
            .unwrap_or_else(|| "AI Narrator".to_string()),
        src,
        duration: None,
    }
}

fn source_for(data: Vec<u8>, extension: Option<String>) -> Result<TrackSource> {
    Ok(match extension.as_deref() {
        Some("pcm" | "raw") => TrackSource::RawPcm { data },
        Some("b64" | "txt") => TrackSource::Base64Pcm {
            data: String::from_utf8(data).context("base64 payload is not UTF-8 text")?,
        },
        _ => TrackSource::Encoded { data, extension },
    })
}

/// First line of `text`, cut on a char boundary with an ellipsis.
fn title_from_text(text: &str, max_chars: usize) -> String {
    let line = text.trim().lines().next().unwrap_or("").trim();
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let cut: String = line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_source_kind() {
        assert_eq!(
            source_for(vec![1, 2], Some("pcm".into())).unwrap(),
            TrackSource::RawPcm { data: vec![1, 2] }
        );
        assert_eq!(
            source_for(b"AAAA".to_vec(), Some("b64".into())).unwrap(),
            TrackSource::Base64Pcm {
                data: "AAAA".into()
            }
        );
        assert_eq!(
            source_for(vec![0], Some("wav".into())).unwrap().kind(),
            "encoded"
        );
        assert_eq!(source_for(vec![0], None).unwrap().kind(), "encoded");
    }

    #[test]
    fn base64_file_must_be_text() {
        assert!(source_for(vec![0xff, 0xfe], Some("txt".into())).is_err());
    }

    #[test]
    fn title_is_first_line_truncated() {
        assert_eq!(title_from_text("  Short note\nmore", 48), "Short note");
        let long = "a".repeat(60);
        let title = title_from_text(&long, 10);
        assert_eq!(title, "aaaaaaa...");
        assert_eq!(title_from_text("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn speech_track_ids_are_stable() {
        let labels = TrackLabels::default();
        let src = TrackSource::Base64Pcm { data: "AAAA".into() };
        let a = track_from_speech("hello", src.clone(), &labels);
        let b = track_from_speech("hello", src, &labels);
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("speech-"));
        assert_eq!(a.id.len(), "speech-".len() + 16);
        let other = track_from_speech("goodbye", TrackSource::RawPcm { data: vec![] }, &labels);
        assert_ne!(a.id, other.id);
        assert_eq!(a.author, "AI Narrator");
        assert_eq!(a.title, "hello");
    }

    #[test]
    fn file_track_uses_labels_and_stem() {
        let dir = std::env::temp_dir().join(format!("narrator-src-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Lecture_01.PCM");
        std::fs::write(&path, [0u8, 0, 0, 0]).unwrap();

        let track = track_from_file(&path, &TrackLabels::default()).unwrap();
        assert_eq!(track.title, "Lecture_01");
        assert!(matches!(track.src, TrackSource::RawPcm { .. }));

        let labels = TrackLabels {
            title: Some("Week 1".into()),
            author: Some("Dr. Okello".into()),
        };
        let track = track_from_file(&path, &labels).unwrap();
        assert_eq!(track.title, "Week 1");
        assert_eq!(track.author, "Dr. Okello");
        std::fs::remove_dir_all(&dir).ok();
    }
}
