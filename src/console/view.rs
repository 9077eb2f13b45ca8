//! Console rendering

use super::{App, ScanFeedback, Tab};
use crate::roster::Attendee;
use crate::scanner::ScannerPhase;
use crate::session::AuthState;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::time::Instant;
use surrealdb::sql::Datetime;

pub(super) fn draw(f: &mut Frame, app: &App) {
    match app.session.state() {
        AuthState::Pending => draw_pending(f),
        AuthState::SignedOut => draw_login(f, app),
        AuthState::SignedIn => draw_dashboard(f, app),
    }

    if let Some(alert) = &app.alert {
        draw_alert(f, alert);
    }
}

fn draw_pending(f: &mut Frame) {
    let area = centered_rect(40, 3, f.size());
    let text = Paragraph::new("Connecting...")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(text, area);
}

fn draw_login(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 11, f.size());
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Check-in Desk — Sign in");
    f.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .margin(1)
        .split(area);

    let email_style = if app.login.focus_password {
        Style::default()
    } else {
        Style::default().fg(Color::Cyan)
    };
    let email = Paragraph::new(app.login.email.as_str())
        .block(Block::default().borders(Borders::ALL).title("Email"))
        .style(email_style);
    f.render_widget(email, inner[0]);

    let masked = "•".repeat(app.login.password.chars().count());
    let password_style = if app.login.focus_password {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let password = Paragraph::new(masked)
        .block(Block::default().borders(Borders::ALL).title("Password"))
        .style(password_style);
    f.render_widget(password, inner[1]);

    if let Some(error) = &app.login.error {
        let line = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        f.render_widget(line, inner[2]);
    }

    let help = Paragraph::new("Tab switch field • Enter sign in • Esc quit")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, inner[3]);
}

fn draw_dashboard(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.size());

    draw_header(f, app, chunks[0]);

    // Wide terminals show both panes; narrow ones behave like the mobile
    // tabs and show only the active one
    if chunks[1].width >= 100 {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);
        draw_scan_pane(f, app, panes[0]);
        draw_list_pane(f, app, panes[1]);
    } else {
        match app.tab {
            Tab::Scan => draw_scan_pane(f, app, chunks[1]),
            Tab::List => draw_list_pane(f, app, chunks[1]),
        }
    }

    draw_footer(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let stats = app.session.stats();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "Check-in Desk",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} In", stats.checked_in),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  •  "),
        Span::raw(format!("{} Total", stats.total)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Overview"));
    f.render_widget(header, area);
}

fn draw_scan_pane(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Scanner");
    f.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .margin(1)
        .split(area);

    let input_title = match app.scanner.phase() {
        ScannerPhase::Active => "Scan input".to_string(),
        ScannerPhase::Cooling { .. } => {
            let remaining = app
                .scanner
                .cooling_remaining(Instant::now())
                .map(|d| d.as_secs() + 1)
                .unwrap_or_default();
            format!("Paused — resumes in {}s", remaining)
        }
        ScannerPhase::Detached => "Scanner detached".to_string(),
    };
    let input = Paragraph::new(app.scan_input.as_str())
        .block(Block::default().borders(Borders::ALL).title(input_title));
    f.render_widget(input, inner[0]);

    match &app.feedback {
        Some((feedback, _)) => draw_feedback(f, feedback, inner[1]),
        None => {
            let hint = Paragraph::new("Scanner Active")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(hint, inner[1]);
        }
    }
}

fn draw_feedback(f: &mut Frame, feedback: &ScanFeedback, area: Rect) {
    let (title, color, detail, attendee): (&str, Color, Option<String>, Option<&Attendee>) =
        match feedback {
            ScanFeedback::Success { attendee } => {
                ("Check-in Successful", Color::Green, None, Some(attendee))
            }
            ScanFeedback::AlreadyIn { attendee, since } => (
                "Already Checked In",
                Color::Yellow,
                Some(format!(
                    "Since: {}",
                    since.as_ref().map(fmt_time).unwrap_or_else(|| "Unknown".into())
                )),
                Some(attendee),
            ),
            ScanFeedback::NotFound { key } => (
                "Not Found",
                Color::Red,
                Some(format!("ID: {} not in DB.", key)),
                None,
            ),
            ScanFeedback::WriteFailed { detail } => (
                "System Error",
                Color::Red,
                Some(format!("DB update failed: {}", detail)),
                None,
            ),
        };

    let mut lines = vec![Line::from(Span::styled(
        title,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))];
    if let Some(detail) = detail {
        lines.push(Line::raw(detail));
    }
    if let Some(attendee) = attendee {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            attendee.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::raw(format!(
            "{} • {}",
            attendee.role_label(),
            attendee.ticket_id
        )));
        if let Some(team) = &attendee.team {
            lines.push(Line::from(Span::styled(
                team.clone(),
                Style::default().fg(Color::Cyan),
            )));
        }
    }

    let card = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Result"))
        .wrap(Wrap { trim: true });
    f.render_widget(card, area);
}

fn draw_list_pane(f: &mut Frame, app: &App, area: Rect) {
    let filtered = app.session.filter(&app.search);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Roster ({})", filtered.len()));
    f.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .margin(1)
        .split(area);

    let search = Paragraph::new(app.search.as_str())
        .block(Block::default().borders(Borders::ALL).title("Search"));
    f.render_widget(search, inner[0]);

    let items: Vec<ListItem> = filtered.iter().map(|a| list_row(a)).collect();
    let list = List::new(items)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    if filtered.is_empty() {
        let empty = Paragraph::new("No results")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, inner[1]);
    } else {
        let mut state = ListState::default();
        state.select(Some(app.selected.min(filtered.len() - 1)));
        f.render_stateful_widget(list, inner[1], &mut state);
    }
}

fn list_row<'a>(attendee: &Attendee) -> ListItem<'a> {
    let mark = if attendee.checked_in {
        Span::styled("● ", Style::default().fg(Color::Green))
    } else {
        Span::styled("○ ", Style::default().fg(Color::DarkGray))
    };
    let mut spans = vec![
        mark,
        Span::styled(
            attendee.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  {} • {}",
            attendee.ticket_id,
            attendee.role_label()
        )),
    ];
    if let Some(team) = &attendee.team {
        spans.push(Span::styled(
            format!("  {}", team),
            Style::default().fg(Color::Cyan),
        ));
    }
    if attendee.checked_in && let Some(time) = &attendee.check_in_time {
        spans.push(Span::styled(
            format!("  {}", fmt_time(time)),
            Style::default().fg(Color::Green),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let content = match &app.banner {
        Some(banner) => Paragraph::new(banner.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title("Fetch error")),
        None => Paragraph::new(
            "Tab scan/list • Enter check in / toggle • Ctrl-R refresh • Ctrl-O sign out • Ctrl-Q quit",
        )
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("Help")),
    };
    f.render_widget(content, area);
}

fn draw_alert(f: &mut Frame, message: &str) {
    let area = centered_rect(44, 5, f.size());
    f.render_widget(Clear, area);
    let alert = Paragraph::new(vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::from(Span::styled(
            "press any key",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Error"));
    f.render_widget(alert, area);
}

fn fmt_time(time: &Datetime) -> String {
    time.with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string()
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
