use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use narration_player::output::AudioOutput;
use narration_player::{DecodedLoad, PendingLoad, PlaybackEngine, PlayerError, ProgressReporter};
use narration_types::{AudioTrack, MediaAction, PlaybackSnapshot, ProgressUpdate};

use crate::media_panel::{MediaPanel, MediaPanelState};

use super::render;

const FRAME: Duration = Duration::from_millis(33);
const LOG_CAP: usize = 500;

/// Launch the TUI, spawn the decode worker, and drive the frame loop.
///
/// `on_frame` runs before every progress tick (the dry-run clock hooks in here).
pub(crate) fn run_tui<O: AudioOutput>(
    engine: PlaybackEngine<O>,
    media: MediaPanel,
    track: AudioTrack,
    output_label: String,
    log_rx: Option<Receiver<String>>,
    on_frame: impl FnMut(),
) -> Result<()> {
    let (load_tx, load_rx) = unbounded::<PendingLoad>();
    let (done_tx, done_rx) = unbounded::<DecodedLoad>();
    let worker = std::thread::Builder::new()
        .name("decode".into())
        .spawn(move || decode_worker(load_rx, done_tx))
        .context("spawn decode worker")?;

    let mut app = App::new(engine, media, output_label, load_tx, done_rx, log_rx);
    app.load(track);

    install_interrupt_handler();
    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app, on_frame);
    restore_terminal(&mut term)?;

    drop(app);
    if worker.join().is_err() {
        tracing::warn!("decode worker panicked");
    }
    result
}

/// Decode pending loads off the UI thread until the sender goes away.
pub(crate) fn decode_worker(rx: Receiver<PendingLoad>, tx: Sender<DecodedLoad>) {
    while let Ok(pending) = rx.recv() {
        tracing::debug!(generation = pending.generation(), "decoding");
        if tx.send(pending.decode()).is_err() {
            break;
        }
    }
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App<O: AudioOutput> {
    engine: PlaybackEngine<O>,
    reporter: ProgressReporter,
    pub(crate) media: MediaPanelState,
    media_panel: MediaPanel,
    load_tx: Sender<PendingLoad>,
    done_rx: Receiver<DecodedLoad>,
    log_rx: Option<Receiver<String>>,
    last_track: Option<AudioTrack>,

    pub(crate) snapshot: PlaybackSnapshot,
    pub(crate) progress: Option<ProgressUpdate>,
    pub(crate) output_label: String,
    pub(crate) status: String,
    pub(crate) help_open: bool,
    pub(crate) logs_open: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_scroll: usize,
    last_status_snapshot: String,
}

impl<O: AudioOutput> App<O> {
    pub(crate) fn new(
        engine: PlaybackEngine<O>,
        media_panel: MediaPanel,
        output_label: String,
        load_tx: Sender<PendingLoad>,
        done_rx: Receiver<DecodedLoad>,
        log_rx: Option<Receiver<String>>,
    ) -> Self {
        let snapshot = engine.snapshot();
        Self {
            engine,
            reporter: ProgressReporter::new(),
            media: media_panel.view(),
            media_panel,
            load_tx,
            done_rx,
            log_rx,
            last_track: None,
            snapshot,
            progress: None,
            output_label,
            status: "Ready".into(),
            help_open: false,
            logs_open: false,
            logs: VecDeque::new(),
            logs_scroll: 0,
            last_status_snapshot: String::new(),
        }
    }

    /// Start loading `track`; the decode result arrives through [`App::pump_decodes`].
    pub(crate) fn load(&mut self, track: AudioTrack) {
        self.status = format!("Loading {}", track.title);
        self.last_track = Some(track.clone());
        let pending = self.engine.begin_load(track);
        if self.load_tx.send(pending).is_err() {
            self.status = "Decode worker stopped".into();
        }
        self.refresh();
    }

    pub(crate) fn pump_decodes(&mut self) {
        while let Ok(done) = self.done_rx.try_recv() {
            match self.engine.complete_load(done) {
                Ok(()) if self.engine.is_playing() => self.status = "Playing".into(),
                Ok(()) => self.status = "Loaded (press Space to play)".into(),
                Err(e) if e.is_silent() => {}
                Err(e) => self.status = format!("Error: {e}"),
            }
        }
        self.refresh();
    }

    /// One frame of progress polling.
    pub(crate) fn tick(&mut self) {
        if let Some(update) = self.reporter.tick(&mut self.engine) {
            if update.ended {
                self.status = "Finished".into();
            }
            self.progress = Some(update);
        }
        self.refresh();
    }

    /// Apply one key press. Returns `true` when the app should quit.
    pub(crate) fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.logs_open {
            match code {
                KeyCode::Char('q') => return true,
                KeyCode::Esc | KeyCode::Char('l') => self.toggle_logs(),
                KeyCode::Up => self.scroll_logs_up(),
                KeyCode::Down => self.scroll_logs_down(),
                _ => {}
            }
            return false;
        }
        if self.help_open {
            if matches!(code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('?')) {
                self.help_open = false;
            }
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char(' ') => self.media_action(MediaAction::TogglePlayPause),
            KeyCode::Left => self.media_action(MediaAction::SeekBackward),
            KeyCode::Right => self.media_action(MediaAction::SeekForward),
            KeyCode::Char('s') => {
                let rate = self.engine.change_speed();
                self.status = format!("Speed {rate}x");
            }
            KeyCode::Char('x') => {
                self.engine.stop();
                self.status = "Stopped".into();
            }
            KeyCode::Char('c') => {
                self.engine.close_player();
                self.progress = None;
                self.status = "Closed".into();
            }
            KeyCode::Char('r') => {
                if let Some(track) = self.last_track.clone() {
                    self.load(track);
                }
            }
            KeyCode::Char('l') => self.toggle_logs(),
            KeyCode::Char('h') | KeyCode::Char('?') => self.help_open = true,
            _ => {}
        }
        self.refresh();
        false
    }

    fn media_action(&mut self, action: MediaAction) {
        if !self.media_panel.accepts(action) {
            self.status = "Nothing loaded".into();
            return;
        }
        match self.engine.handle_media_action(action) {
            Ok(()) => {}
            Err(PlayerError::ResourceUnavailable(reason)) => {
                self.status = format!("Audio output unavailable: {reason}");
            }
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn refresh(&mut self) {
        self.snapshot = self.engine.snapshot();
        self.media = self.media_panel.view();
    }

    fn toggle_logs(&mut self) {
        self.logs_open = !self.logs_open;
        if !self.logs_open {
            self.logs_scroll = 0;
        }
    }

    fn scroll_logs_up(&mut self) {
        let max = self.logs.len().saturating_sub(1);
        self.logs_scroll = (self.logs_scroll + 1).min(max);
    }

    fn scroll_logs_down(&mut self) {
        self.logs_scroll = self.logs_scroll.saturating_sub(1);
    }

    fn push_log_line(&mut self, line: String) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn note_status_change(&mut self) {
        if self.last_status_snapshot == self.status {
            return;
        }
        let line = self.status.clone();
        self.last_status_snapshot = self.status.clone();
        self.push_log_line(line);
    }

    fn drain_logs(&mut self) {
        let Some(rx) = self.log_rx.as_ref() else {
            return;
        };
        let lines: Vec<String> = rx.try_iter().collect();
        for line in lines {
            self.push_log_line(line);
        }
    }
}

fn ui_loop<O: AudioOutput>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<O>,
    mut on_frame: impl FnMut(),
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        app.pump_decodes();
        app.drain_logs();
        on_frame();
        app.tick();
        app.note_status_change();
        terminal.draw(|f| render::draw(f, app))?;

        let timeout = FRAME.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("poll terminal events")? {
            if let CEvent::Key(k) = event::read().context("read terminal event")? {
                // Raw mode swallows SIGINT.
                let interrupt =
                    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c');
                if k.kind == KeyEventKind::Press && (interrupt || app.handle_key(k.code)) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= FRAME {
            last_tick = Instant::now();
        }
    }
}

/// Restore the terminal before exiting on Ctrl-C.
fn install_interrupt_handler() {
    let installed = ctrlc::set_handler(|| {
        disable_raw_mode().ok();
        execute!(io::stdout(), LeaveAlternateScreen).ok();
        std::process::exit(130);
    });
    if let Err(e) = installed {
        tracing::warn!("ctrl-c handler not installed: {e}");
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}
