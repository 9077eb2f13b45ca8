//! Interactive check-in console.
//!
//! One event loop owns the session: terminal events and the tick
//! interval are multiplexed with `select!`, and every reconcile
//! operation is awaited from here, so roster state needs no locking.

mod view;

use crate::config::Config;
use crate::error::{DeskError, Result};
use crate::reconcile::ScanOutcome;
use crate::roster::Attendee;
use crate::scanner::Scanner;
use crate::session::{AuthState, Session};
use crate::ticket;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{execute, terminal};
use futures_util::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::time::{Duration, Instant};
use surrealdb::sql::Datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tab {
    Scan,
    List,
}

/// Transient result card shown in the scan pane
pub(crate) enum ScanFeedback {
    Success {
        attendee: Attendee,
    },
    AlreadyIn {
        attendee: Attendee,
        since: Option<Datetime>,
    },
    NotFound {
        key: String,
    },
    WriteFailed {
        detail: String,
    },
}

#[derive(Default)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
    focus_password: bool,
    error: Option<String>,
}

pub(crate) struct App {
    session: Session,
    scanner: Scanner,
    login: LoginForm,
    tab: Tab,
    search: String,
    selected: usize,
    scan_input: String,
    feedback: Option<(ScanFeedback, Instant)>,
    /// Fetch error banner; persists until the next successful fetch
    banner: Option<String>,
    /// Blocking alert; any key dismisses
    alert: Option<String>,
    result_ttl: Duration,
    should_quit: bool,
}

impl App {
    fn new(session: Session, config: &Config) -> Self {
        let cooldown = Duration::from_secs(config.event.scan_cooldown_secs);
        Self {
            session,
            scanner: Scanner::new(cooldown),
            login: LoginForm::default(),
            tab: Tab::Scan,
            search: String::new(),
            selected: 0,
            scan_input: String::new(),
            feedback: None,
            banner: None,
            alert: None,
            // Result cards clear on the same window the scanner resumes
            result_ttl: cooldown,
            should_quit: false,
        }
    }

    async fn on_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return Ok(());
        }
        if self.alert.is_some() {
            self.alert = None;
            return Ok(());
        }

        match self.session.state() {
            AuthState::Pending => Ok(()),
            AuthState::SignedOut => self.on_login_key(key).await,
            AuthState::SignedIn => self.on_dashboard_key(key).await,
        }
    }

    async fn on_login_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.login.focus_password = !self.login.focus_password;
            }
            KeyCode::Backspace => {
                let field = if self.login.focus_password {
                    &mut self.login.password
                } else {
                    &mut self.login.email
                };
                field.pop();
            }
            KeyCode::Char(c) => {
                if self.login.focus_password {
                    self.login.password.push(c);
                } else {
                    self.login.email.push(c);
                }
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                if !self.login.focus_password && !self.login.email.is_empty() {
                    self.login.focus_password = true;
                    return Ok(());
                }
                self.submit_login().await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn submit_login(&mut self) -> Result<()> {
        self.login.error = None;
        let email = self.login.email.clone();
        let password = self.login.password.clone();
        match self.session.sign_in(&email, &password).await {
            Ok(()) => self.enter_dashboard(),
            Err(DeskError::Auth { message }) => {
                self.login.password.clear();
                self.login.error = Some(message);
            }
            Err(DeskError::Fetch { message }) => {
                // Signed in, first fetch failed: banner, not a login error
                self.banner = Some(message);
                self.enter_dashboard();
            }
            Err(other) => {
                self.login.error = Some(other.to_string());
            }
        }
        Ok(())
    }

    fn enter_dashboard(&mut self) {
        self.tab = Tab::Scan;
        self.selected = 0;
        self.scanner.attach();
    }

    async fn on_dashboard_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('r') => return self.refresh().await,
                KeyCode::Char('o') => return self.leave_session().await,
                _ => return Ok(()),
            }
        }

        match key.code {
            KeyCode::Tab => {
                self.tab = match self.tab {
                    Tab::Scan => Tab::List,
                    Tab::List => Tab::Scan,
                };
            }
            _ => match self.tab {
                Tab::Scan => self.on_scan_key(key).await?,
                Tab::List => self.on_list_key(key).await?,
            },
        }
        Ok(())
    }

    async fn on_scan_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            // A paused engine delivers no decodes; typed input is dropped
            KeyCode::Char(c) if self.scanner.is_active() => self.scan_input.push(c),
            KeyCode::Backspace => {
                self.scan_input.pop();
            }
            KeyCode::Esc => self.scan_input.clear(),
            KeyCode::Enter => self.submit_scan().await?,
            _ => {}
        }
        Ok(())
    }

    async fn submit_scan(&mut self) -> Result<()> {
        let raw = self.scan_input.trim().to_string();
        if raw.is_empty() {
            return Ok(());
        }
        let now = Instant::now();
        if !self.scanner.accept(now) {
            return Ok(());
        }
        self.scan_input.clear();

        let feedback = match self.session.check_in(&raw).await {
            Ok(ScanOutcome::CheckedIn { attendee }) => ScanFeedback::Success { attendee },
            Ok(ScanOutcome::AlreadyCheckedIn { attendee, since }) => {
                ScanFeedback::AlreadyIn { attendee, since }
            }
            Ok(ScanOutcome::NotFound { key }) => ScanFeedback::NotFound { key },
            Err(DeskError::Sync { message }) => ScanFeedback::WriteFailed { detail: message },
            Err(other) => ScanFeedback::WriteFailed {
                detail: other.to_string(),
            },
        };
        self.feedback = Some((feedback, now));
        Ok(())
    }

    async fn on_list_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                let len = self.session.filter(&self.search).len();
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Backspace => {
                self.search.pop();
                self.selected = 0;
            }
            KeyCode::Esc => {
                self.search.clear();
                self.selected = 0;
            }
            KeyCode::Char(c) => {
                self.search.push(c);
                self.selected = 0;
            }
            KeyCode::Enter => self.toggle_selected().await?,
            _ => {}
        }
        Ok(())
    }

    async fn toggle_selected(&mut self) -> Result<()> {
        let key = {
            let filtered = self.session.filter(&self.search);
            match filtered.get(self.selected) {
                Some(attendee) => ticket::clean_id(&attendee.ticket_id),
                None => return Ok(()),
            }
        };
        match self.session.toggle(&key).await {
            Ok(_) => {}
            Err(DeskError::Sync { .. }) => {
                self.alert = Some("Failed to update status".to_string());
            }
            Err(other) => {
                self.alert = Some(other.to_string());
            }
        }
        Ok(())
    }

    /// On-demand full re-fetch; the scanner is released for the duration
    async fn refresh(&mut self) -> Result<()> {
        self.scanner.detach();
        match self.session.refresh().await {
            Ok(()) => self.banner = None,
            Err(DeskError::Fetch { message }) => self.banner = Some(message),
            Err(other) => self.banner = Some(other.to_string()),
        }
        self.selected = 0;
        if self.session.state() == AuthState::SignedIn {
            self.scanner.attach();
        }
        Ok(())
    }

    async fn leave_session(&mut self) -> Result<()> {
        self.scanner.detach();
        self.session.sign_out().await?;
        self.login = LoginForm::default();
        self.search.clear();
        self.scan_input.clear();
        self.feedback = None;
        self.banner = None;
        self.alert = None;
        self.selected = 0;
        Ok(())
    }

    fn on_tick(&mut self, now: Instant) {
        self.scanner.tick(now);
        if let Some((_, shown_at)) = &self.feedback
            && now.duration_since(*shown_at) >= self.result_ttl
        {
            self.feedback = None;
        }
    }
}

/// Run the console until the operator quits
pub async fn run(mut session: Session, config: &Config) -> Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // The terminal is up and the backend handle is live: that is the
    // ready signal the gate waits for
    session.ready();
    let mut app = App::new(session, config);
    let result = event_loop(&mut terminal, &mut app).await;

    terminal::disable_raw_mode()?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(200));

    while !app.should_quit {
        terminal.draw(|f| view::draw(f, app))?;

        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => app.on_key(key).await?,
                    Some(Ok(_)) => {} // resize etc. handled by the next draw
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
            _ = tick.tick() => app.on_tick(Instant::now()),
        }
    }
    Ok(())
}
