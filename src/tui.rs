use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::backend::Backend;
use crate::dashboard::{Card, Dashboard, DashboardView, Listing};
use crate::models::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    ConfirmDelete,
}

struct AppState {
    dashboard: Dashboard,
    view: DashboardView,
    selected: usize,
    scroll_offset: u16,
    mode: Mode,
    message: Option<String>,
}

impl AppState {
    fn new(dashboard: Dashboard) -> Self {
        let view = dashboard.view();
        Self {
            dashboard,
            view,
            selected: 0,
            scroll_offset: 0,
            mode: Mode::Browse,
            message: None,
        }
    }

    fn cards(&self) -> &[Card] {
        match &self.view.listing {
            Listing::Cards(cards) => cards.as_slice(),
            Listing::Placeholder => &[],
        }
    }

    fn current_card(&self) -> Option<&Card> {
        self.cards().get(self.selected)
    }

    fn next(&mut self) {
        let len = self.cards().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Apply one key press. Returns true when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode, backend: &dyn Backend) -> bool {
        match self.mode {
            Mode::ConfirmDelete => {
                match code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => self.delete_selected(backend),
                    _ => self.message = None,
                }
                self.mode = Mode::Browse;
                false
            }
            Mode::Browse => {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => return true,
                    KeyCode::Down | KeyCode::Char('j') => self.next(),
                    KeyCode::Up | KeyCode::Char('k') => self.prev(),
                    KeyCode::Char('J') | KeyCode::PageDown => self.scroll_down(),
                    KeyCode::Char('K') | KeyCode::PageUp => self.scroll_up(),
                    KeyCode::Char('d') | KeyCode::Delete => {
                        if self.current_card().is_some() {
                            self.mode = Mode::ConfirmDelete;
                            self.message = Some(
                                "Are you sure you want to delete this application? (y/n)"
                                    .to_string(),
                            );
                        }
                    }
                    _ => {}
                }
                false
            }
        }
    }

    fn delete_selected(&mut self, backend: &dyn Backend) {
        let Some(id) = self.current_card().map(|card| card.id.clone()) else {
            return;
        };
        match self.dashboard.delete(backend, &id) {
            Ok(()) => {
                self.view = self.dashboard.view();
                let len = self.cards().len();
                self.selected = self.selected.min(len.saturating_sub(1));
                self.scroll_offset = 0;
                self.message = Some("Application deleted successfully".to_string());
            }
            Err(e) => {
                self.message = Some(format!("Error deleting application: {e}"));
            }
        }
    }
}

pub fn run_dashboard(dashboard: Dashboard, backend: &dyn Backend) -> Result<()> {
    let mut state = AppState::new(dashboard);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, backend);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    backend: &dyn Backend,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if state.handle_key(key.code, backend) {
                break;
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn status_style(status: &str) -> Style {
    match status.parse::<Status>() {
        Ok(Status::Applied) | Err(_) => Style::default().fg(Color::Cyan),
        Ok(Status::Interview) => Style::default().fg(Color::Green),
        Ok(Status::Review) => Style::default().fg(Color::Yellow),
        Ok(Status::Offer) => Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
        Ok(Status::Rejected) => Style::default().fg(Color::Red),
        Ok(Status::Archived) => Style::default().fg(Color::DarkGray),
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(
        Paragraph::new(state.view.greeting.as_str()).style(Style::default().add_modifier(Modifier::BOLD)),
        rows[0],
    );

    // Stat cards
    let stat_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(rows[1]);
    for ((label, value), area) in state.view.stats.cards().iter().zip(stat_areas.iter()) {
        let card = Paragraph::new(value.to_string())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(format!(" {label} ")));
        frame.render_widget(card, *area);
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);

    match &state.view.listing {
        Listing::Placeholder => {
            let empty = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No applications yet",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from("Run `jobdash add` to track your first application!"),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Recent Applications "));
            frame.render_widget(empty, rows[2]);
        }
        Listing::Cards(cards) => {
            let items: Vec<ListItem> = cards
                .iter()
                .map(|card| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("[{}] ", card.initial),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::raw(format!("{} | {} ", card.role, card.company)),
                        Span::styled(
                            card.status_label,
                            status_style(card.status_class.trim_start_matches("status-")),
                        ),
                    ]))
                })
                .collect();

            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title(format!(
                    " Recent Applications ({}) ",
                    cards.len()
                )))
                .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            frame.render_stateful_widget(list, body[0], list_state);

            let detail = Paragraph::new(build_detail(state))
                .block(Block::default().borders(Borders::ALL).title(" Detail "))
                .wrap(Wrap { trim: false })
                .scroll((state.scroll_offset, 0));
            frame.render_widget(detail, body[1]);
        }
    }

    // Footer: last action outcome, or key help
    let footer = match &state.message {
        Some(message) => Paragraph::new(message.as_str()).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(" j/k:navigate  J/K:scroll  d:delete  q:quit")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[3]);
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(card) = state.current_card() else {
        return Text::raw("No application selected");
    };
    let Some(app) = state.dashboard.get(&card.id) else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        card.role.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", card.company)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", card.status_label),
        status_style(&app.status),
    )));
    lines.push(Line::from(format!("Applied: {}", card.applied_on)));
    lines.push(Line::from(format!("Priority: {}", app.priority)));
    if let Some(platform) = &app.platform {
        lines.push(Line::from(format!("Source: {platform}")));
    }
    lines.push(Line::from(format!(
        "Added: {}",
        app.created_at.format("%Y-%m-%d %H:%M")
    )));
    lines.push(Line::from(Span::styled(
        format!("ID: {}", card.id),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    match &app.notes {
        Some(notes) => {
            lines.push(Line::from(Span::styled(
                "Notes",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(notes, 60).lines() {
                lines.push(Line::from(format!("  {line}")));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No notes)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    Text::from(lines)
}
