//! App — the main TUI event loop.
//!
//! Owns the terminal, the message channel, the job lifecycle and the
//! components.  Components only see a read-only `AppState` snapshot which
//! the loop re-syncs from the lifecycle controller after every message.

use std::io;

use anyhow::Result;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use court_proto::config::Config;
use court_proto::dates::DateRange;
use court_proto::error::ClientError;
use court_proto::protocol::StreamEvent;

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::client::JobClient;
use crate::component::Component;
use crate::components::{DateForm, LogPanel, ResultsGrid};
use crate::lifecycle::{LifecycleController, Phase};
use crate::render::DisplayModel;
use crate::theme::{C_BUSY, C_ERROR, C_MUTED, C_OK, C_SECONDARY};

// ── Messages ──────────────────────────────────────────────────────────────────

/// Everything that can wake the main loop.
#[derive(Debug)]
pub enum AppMessage {
    /// Terminal input from the blocking reader task.
    Event(Event),
    /// Outcome of the submission request: job id or error.
    SubmitFinished(Result<String, ClientError>),
    /// One decoded event from the job stream.
    Stream(StreamEvent),
    /// Connection-level note from the subscriber (reconnects etc).
    StreamNotice(String),
    /// One-second heartbeat while a job is in flight.
    TimerTick,
}

// ── App ───────────────────────────────────────────────────────────────────────

const FOCUS_ORDER: [ComponentId; 3] = [
    ComponentId::DateForm,
    ComponentId::ResultsGrid,
    ComponentId::LogPanel,
];

pub struct App {
    client: JobClient,
    lifecycle: LifecycleController,
    state: AppState,

    date_form: DateForm,
    results_grid: ResultsGrid,
    log_panel: LogPanel,
    focus: ComponentId,

    /// In-flight POST; aborted when a new submission supersedes it.
    submit_task: Option<AbortHandle>,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            client: JobClient::new(config.client.base_url.clone()),
            lifecycle: LifecycleController::new(),
            state: AppState::default(),
            date_form: DateForm::new(),
            results_grid: ResultsGrid::new(),
            log_panel: LogPanel::new(),
            focus: ComponentId::DateForm,
            submit_task: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        loop {
            terminal.draw(|f| self.draw(f))?;
            if self.should_quit {
                break;
            }
            match rx.recv().await {
                Some(msg) => self.handle_message(msg, &tx).await,
                None => break,
            }
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage, tx: &mpsc::Sender<AppMessage>) {
        match msg {
            AppMessage::Event(ev) => {
                if let Event::Key(key) = ev {
                    if key.kind == KeyEventKind::Release {
                        return;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a, tx).await;
                    }
                }
            }

            AppMessage::SubmitFinished(result) => {
                // A stale POST result can arrive after the job it belonged to
                // was superseded; only the Submitting phase accepts one.
                if self.lifecycle.phase() != Phase::Submitting {
                    debug!("ignoring stale submit result: {:?}", result);
                    return;
                }
                match result {
                    Ok(job_id) => {
                        info!("job accepted: {job_id}");
                        self.lifecycle
                            .log_line(format!("Job accepted ({job_id})"));
                        let stream = self.client.subscribe(job_id, tx.clone());
                        self.lifecycle.stream_opened(stream);
                    }
                    Err(e) => {
                        warn!("submit failed: {e}");
                        self.lifecycle.submit_failed(&e.to_string());
                        self.state.error_message = Some(e.to_string());
                    }
                }
            }

            AppMessage::Stream(event) => {
                self.lifecycle.on_stream_event(event);
            }

            AppMessage::StreamNotice(note) => {
                debug!("stream notice: {note}");
                self.lifecycle.log_line(note);
            }

            AppMessage::TimerTick => {
                self.lifecycle.on_timer_tick();
            }
        }

        self.sync_state();
    }

    /// Re-derive the component-visible snapshot from the lifecycle.
    fn sync_state(&mut self) {
        self.state.phase = self.lifecycle.phase();
        self.state.elapsed_secs = self.lifecycle.elapsed_secs();
        self.state.logs = self.lifecycle.aggregator().logs().to_vec();
        self.state.display = DisplayModel::project(self.lifecycle.aggregator().table());
        if self.state.phase.is_busy() {
            self.state.error_message = None;
        }
    }

    fn handle_key(&mut self, key: ratatui::crossterm::event::KeyEvent) -> Vec<Action> {
        // Global bindings first.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }
        match key.code {
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::Char('q') if self.focus != ComponentId::DateForm => {
                return vec![Action::Quit]
            }
            _ => {}
        }
        match self.focus {
            ComponentId::DateForm => self.date_form.handle_key(key, &self.state),
            ComponentId::ResultsGrid => self.results_grid.handle_key(key, &self.state),
            ComponentId::LogPanel => self.log_panel.handle_key(key, &self.state),
        }
    }

    async fn dispatch(&mut self, action: Action, tx: &mpsc::Sender<AppMessage>) {
        match action {
            Action::Submit(range) => self.start_job(range, tx),
            Action::ShowError(msg) => {
                warn!("rejected input: {msg}");
                self.state.error_message = Some(msg.clone());
                self.lifecycle.log_line(format!("Error: {msg}"));
            }
            Action::Book { date, court, slot } => {
                // Booking is a stub: the affordance exists, the action only logs.
                info!("book requested: {date} court {court} {slot}");
                self.lifecycle
                    .log_line(format!("Book: {date} court {court} {slot}"));
            }
            Action::FocusNext => {
                let idx = FOCUS_ORDER.iter().position(|c| *c == self.focus).unwrap_or(0);
                self.focus = FOCUS_ORDER[(idx + 1) % FOCUS_ORDER.len()];
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
        self.sync_state();
    }

    /// Abort whatever was running and open a fresh job.
    fn start_job(&mut self, range: DateRange, tx: &mpsc::Sender<AppMessage>) {
        if let Some(task) = self.submit_task.take() {
            task.abort();
        }
        self.state.error_message = None;
        self.lifecycle.begin_submit(tx.clone());
        self.lifecycle.log_line(format!(
            "Checking {} .. {}",
            range.start_string(),
            range.end_string()
        ));

        let client = self.client.clone();
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            let result = client.submit(&range).await;
            let _ = tx.send(AppMessage::SubmitFinished(result)).await;
        });
        self.submit_task = Some(handle.abort_handle());
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(8),
                Constraint::Length(7),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let focus = self.focus;
        let state = std::mem::take(&mut self.state);
        self.date_form
            .draw(frame, rows[0], focus == ComponentId::DateForm, &state);
        self.results_grid
            .draw(frame, rows[1], focus == ComponentId::ResultsGrid, &state);
        self.log_panel
            .draw(frame, rows[2], focus == ComponentId::LogPanel, &state);
        draw_status_bar(frame, rows[3], &state);
        self.state = state;
    }
}

fn draw_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let (badge_color, badge) = match state.phase {
        Phase::Idle => (C_MUTED, state.phase.badge()),
        Phase::Submitting | Phase::Streaming => (C_BUSY, state.phase.badge()),
        Phase::Completed => (C_OK, state.phase.badge()),
        Phase::Failed => (C_ERROR, state.phase.badge()),
    };
    let mut spans = vec![
        Span::styled(format!(" {badge} "), Style::default().fg(badge_color)),
        Span::styled(
            format!(" elapsed: {}s ", state.elapsed_secs),
            Style::default().fg(C_SECONDARY),
        ),
    ];
    if let Some(err) = &state.error_message {
        spans.push(Span::styled(
            format!(" {err} "),
            Style::default().fg(C_ERROR),
        ));
    }
    spans.push(Span::styled(
        " tab: focus  enter: check/book  ctrl-c: quit",
        Style::default().fg(C_MUTED),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
