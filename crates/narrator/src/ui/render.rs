use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph},
};

use narration_player::output::AudioOutput;
use narration_types::{MediaPlaybackState, PlaybackPhase, PlaybackSnapshot};

use super::app::App;

pub(crate) fn draw<O: AudioOutput>(f: &mut ratatui::Frame, app: &App<O>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3), Constraint::Length(6)])
        .split(f.area());

    let (title, author, album) = match app.media.now_playing.as_ref() {
        Some(np) => (np.title.as_str(), np.author.as_str(), np.album.as_str()),
        None => ("-", "-", "-"),
    };
    let now_playing = Paragraph::new(vec![
        Line::from(format!("title: {title}")),
        Line::from(format!("author: {author}")),
        Line::from(format!("album: {album}")),
        Line::from(format!("output: {}", app.output_label)),
        Line::from(format!("media keys: {}", media_label(app.media.playback_state))),
    ])
    .block(Block::default().borders(Borders::ALL).title("Now Playing"));
    f.render_widget(now_playing, chunks[0]);

    let transport = Paragraph::new(vec![
        Line::from(format!("state: {}", phase_label(app.snapshot.phase))),
        Line::from(format!("speed: {}x", app.snapshot.playback_rate)),
        Line::from(position_line(&app.snapshot)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Player"));
    f.render_widget(transport, chunks[1]);

    let footer_block = Block::default().borders(Borders::ALL).title("Status");
    let footer_inner = footer_block.inner(chunks[2]);
    f.render_widget(footer_block, chunks[2]);

    let footer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(footer_inner);

    f.render_widget(
        Paragraph::new(Line::from(format!("status: {}", app.status))),
        footer_chunks[0],
    );

    let (ratio, label) = gauge_parts(&app.snapshot);
    let gauge_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(24)])
        .split(footer_chunks[1]);
    let gauge = Gauge::default()
        .ratio(ratio)
        .style(Style::default().fg(Color::Black).bg(Color::White))
        .gauge_style(Style::default().fg(Color::White).bg(Color::Black));
    f.render_widget(gauge, gauge_chunks[0]);
    f.render_widget(
        Paragraph::new(Line::from(label)).alignment(Alignment::Right),
        gauge_chunks[1],
    );

    f.render_widget(
        Paragraph::new(Line::from(
            "keys: Space play/pause | ←/→ seek 10s | s speed | x stop | c close | r reload | l logs | h help | q quit",
        )),
        footer_chunks[2],
    );

    if app.help_open {
        let area = centered_rect(60, 70, f.area());
        f.render_widget(Clear, area);
        let help = [
            "Playback",
            "  Space        play/pause",
            "  ←/→          seek −10s / +10s",
            "  s            cycle speed (1x, 1.5x, 2x)",
            "  x            stop (rewind to start)",
            "  c            close player",
            "  r            reload track",
            "",
            "Other",
            "  l            logs",
            "  h or ?       help",
            "  q            quit",
            "  Esc          close modal",
        ]
        .join("\n");
        let block = Block::default().title("Help").borders(Borders::ALL);
        f.render_widget(Paragraph::new(help).block(block), area);
    }

    if app.logs_open {
        let area = centered_rect(90, 80, f.area());
        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Logs (Esc to close, ↑/↓ scroll)");
        let inner = block.inner(area);
        let height = inner.height as usize;
        let total = app.logs.len();
        let end = total.saturating_sub(app.logs_scroll);
        let start = end.saturating_sub(height);
        let mut items: Vec<ListItem> = app
            .logs
            .iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .map(|line| ListItem::new(line.clone()))
            .collect();
        if items.is_empty() {
            items.push(ListItem::new("<no logs>"));
        }
        f.render_widget(List::new(items).block(block), area);
    }
}

fn phase_label(phase: PlaybackPhase) -> &'static str {
    match phase {
        PlaybackPhase::Empty => "no track",
        PlaybackPhase::Loading => "loading",
        PlaybackPhase::Paused => "paused",
        PlaybackPhase::Playing => "playing",
        PlaybackPhase::Ended => "ended",
    }
}

fn media_label(state: MediaPlaybackState) -> &'static str {
    match state {
        MediaPlaybackState::None => "none",
        MediaPlaybackState::Paused => "paused",
        MediaPlaybackState::Playing => "playing",
    }
}

fn position_line(snap: &PlaybackSnapshot) -> String {
    if snap.duration <= 0.0 {
        return "position: -".to_string();
    }
    format!(
        "position: {} / {} ({:.1}%)",
        format_duration(snap.current_time),
        format_duration(snap.duration),
        snap.progress_percent
    )
}

fn gauge_parts(snap: &PlaybackSnapshot) -> (f64, String) {
    if snap.duration <= 0.0 {
        return (0.0, "-:-- left".to_string());
    }
    let ratio = (snap.current_time / snap.duration).clamp(0.0, 1.0);
    let remaining = format_duration((snap.duration - snap.current_time).max(0.0));
    (ratio, format!("{remaining} left"))
}

/// `m:ss`, seconds floored.
pub(crate) fn format_duration(secs: f64) -> String {
    let total_secs = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

fn centered_rect(percent_x: u16, percent_y: u16, r: ratatui::layout::Rect) -> ratatui::layout::Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_floor_to_whole_seconds() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(9.99), "0:09");
        assert_eq!(format_duration(75.0), "1:15");
        assert_eq!(format_duration(-3.0), "0:00");
        assert_eq!(format_duration(f64::NAN), "0:00");
    }

    #[test]
    fn gauge_clamps_and_reports_remaining() {
        let snap = PlaybackSnapshot {
            current_time: 30.0,
            duration: 120.0,
            ..PlaybackSnapshot::default()
        };
        let (ratio, label) = gauge_parts(&snap);
        assert!((ratio - 0.25).abs() < 1e-9);
        assert_eq!(label, "1:30 left");

        let (ratio, _) = gauge_parts(&PlaybackSnapshot::default());
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn unknown_duration_hides_position() {
        assert_eq!(position_line(&PlaybackSnapshot::default()), "position: -");
    }

    #[test]
    fn popup_is_centered() {
        let r = ratatui::layout::Rect::new(0, 0, 100, 50);
        let c = centered_rect(50, 50, r);
        assert_eq!(c.width, 50);
        assert_eq!(c.x, 25);
    }
}
