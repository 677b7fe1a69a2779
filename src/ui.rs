//! TUI module using ratatui.
//!
//! Draws the controller's `Screen` and maps keys onto refresh, filter and
//! scroll actions. Loads run on the tokio runtime and report back over a
//! channel, so the interface stays responsive while a request is in flight.

use crate::config::View;
use crate::controller::RefreshController;
use crate::filter::{FilterOptions, Filters};
use crate::loader::{BriefingSource, CombinedError, Loaded};
use crate::render::{ArticleView, BodyView, HeaderView, Screen};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use futures_util::StreamExt;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

const PAGE: u16 = 10;

type Outcome = Result<Loaded, CombinedError>;

/// Run the interactive briefing viewer until the user quits
pub async fn run(
    source: Arc<dyn BriefingSource>,
    filters: Filters,
    view: View,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut app = App::new(source, filters, view, tx);
    let result = app.run(&mut terminal, rx).await;
    ratatui::restore();
    result
}

struct App {
    source: Arc<dyn BriefingSource>,
    controller: RefreshController,
    filters: Filters,
    options: FilterOptions,
    view: View,
    scroll: u16,
    tx: mpsc::UnboundedSender<Outcome>,
    quit: bool,
}

impl App {
    fn new(
        source: Arc<dyn BriefingSource>,
        filters: Filters,
        view: View,
        tx: mpsc::UnboundedSender<Outcome>,
    ) -> Self {
        Self {
            source,
            controller: RefreshController::new(),
            filters,
            options: FilterOptions::default(),
            view,
            scroll: 0,
            tx,
            quit: false,
        }
    }

    async fn run(
        &mut self,
        terminal: &mut DefaultTerminal,
        mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    ) -> anyhow::Result<()> {
        let mut events = EventStream::new();

        // Initial load
        self.trigger_refresh();

        while !self.quit {
            let screen = self.controller.screen(&self.filters, self.view);
            terminal.draw(|frame| self.draw(frame, &screen))?;

            tokio::select! {
                Some(outcome) = outcomes.recv() => self.settle(outcome),
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) => self.handle_key(key),
                    // Resizes and other events only need a redraw
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => self.quit = true,
                },
            }
        }

        Ok(())
    }

    fn trigger_refresh(&mut self) {
        if !self.controller.trigger() {
            return;
        }
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = source.load().await;
            // The receiver is gone only if the UI already quit
            let _ = tx.send(outcome);
        });
    }

    fn settle(&mut self, outcome: Outcome) {
        self.controller.settle(outcome);
        self.options = self.controller.filter_options();
        self.filters.retain_known(&self.options);
        self.scroll = 0;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        debug!(code = ?key.code, "key pressed");

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('r') => self.trigger_refresh(),
            KeyCode::Char('v') => {
                self.filters.vertical = self.options.next_vertical(&self.filters.vertical);
                self.scroll = 0;
            }
            KeyCode::Char('c') => {
                self.filters.compliance = self.options.next_compliance(&self.filters.compliance);
                self.scroll = 0;
            }
            KeyCode::Char('g') => {
                self.view = self.view.toggled();
                self.scroll = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(PAGE),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(PAGE),
            KeyCode::Home => self.scroll = 0,
            _ => {}
        }
    }

    fn draw(&self, frame: &mut Frame, screen: &Screen) {
        let header_lines = header_lines(&screen.header);
        let header_height = header_lines.len() as u16 + 2;
        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(header_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let header = Paragraph::new(header_lines)
            .block(Block::default().borders(Borders::ALL).title(" Compliance briefing "))
            .wrap(Wrap { trim: true });
        frame.render_widget(header, header_area);

        let title = format!(
            " {} · vertical: {} · compliance: {} ",
            match self.view {
                View::List => "Latest",
                View::Grouped => "By vertical",
            },
            self.options.vertical_label(&self.filters.vertical),
            self.options.compliance_label(&self.filters.compliance),
        );
        let body = Paragraph::new(body_lines(&screen.body))
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(body, body_area);

        let refresh_style = if screen.refresh.enabled {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let footer = Line::from(vec![
            Span::styled(format!("[r] {}", screen.refresh.label), refresh_style),
            Span::raw("  [v] vertical  [c] compliance  [g] layout  [↑↓] scroll  [q] quit"),
        ]);
        frame.render_widget(Paragraph::new(footer), footer_area);
    }
}

/// Header region as styled lines
pub fn header_lines(header: &HeaderView) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    if let Some(notice) = &header.notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(header.generated_at.clone()));
    lines.push(Line::from(vec![
        Span::styled(format!("{}: ", header.total_label), label),
        Span::styled(header.total_items.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        Span::styled(format!("{}: ", header.source_count_label), label),
        Span::styled(header.source_count.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ]));
    lines.push(Line::from(header.sources.clone()));
    lines
}

/// Articles region as styled lines
pub fn body_lines(body: &BodyView) -> Vec<Line<'static>> {
    match body {
        BodyView::Loading(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().add_modifier(Modifier::ITALIC),
        ))],
        BodyView::Failed(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        ))],
        BodyView::Empty(message) => vec![Line::from(message.clone())],
        BodyView::Articles(articles) => {
            let mut lines = Vec::new();
            for article in articles {
                push_article(&mut lines, article);
            }
            lines
        }
        BodyView::Grouped(sections) => {
            let mut lines = Vec::new();
            for section in sections {
                lines.push(Line::from(Span::styled(
                    section.heading.to_uppercase(),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                )));
                for segment in &section.segments {
                    lines.push(Line::from(Span::styled(
                        format!("── {}", segment.heading),
                        Style::default().fg(Color::Blue),
                    )));
                    for article in &segment.articles {
                        push_article(&mut lines, article);
                    }
                }
            }
            lines
        }
    }
}

fn push_article(lines: &mut Vec<Line<'static>>, article: &ArticleView) {
    lines.push(Line::from(Span::styled(
        article.title.clone(),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    if !article.verticals.is_empty() {
        lines.push(Line::from(Span::styled(
            article
                .verticals
                .iter()
                .map(|v| format!("[{}]", v))
                .collect::<Vec<_>>()
                .join(" "),
            Style::default().fg(Color::Magenta),
        )));
    }
    lines.push(Line::from(Span::styled(
        article.meta.clone(),
        Style::default().fg(Color::DarkGray),
    )));
    if let Some(summary) = &article.summary {
        lines.push(Line::from(summary.clone()));
    }
    if let Some(focus) = &article.compliance_focus {
        lines.push(Line::from(Span::styled(
            focus.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(keywords) = &article.keywords {
        lines.push(Line::from(Span::styled(
            keywords.clone(),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines.push(Line::from(Span::styled(
        article.href.clone(),
        Style::default().add_modifier(Modifier::UNDERLINED),
    )));
    lines.push(Line::default());
}
