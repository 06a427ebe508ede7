//! # StatusBar Component
//!
//! Bottom line showing the most recent status event.
//!
//! Status events arrive from the bus with a stable id; a republished
//! event replaces the stored copy and moves to the front. Expired events
//! are pruned every tick, so nothing needs to remove them explicitly.

use chrono::{DateTime, Utc};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::core::status::StatusEvent;
use crate::tui::component::Component;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Live status events, oldest first.
#[derive(Debug, Default)]
pub struct StatusBarState {
    events: Vec<StatusEvent>,
}

impl StatusBarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, event: StatusEvent) {
        if let Some(id) = event.id() {
            self.events.retain(|e| e.id() != Some(id));
        }
        self.events.push(event);
    }

    /// Drops expired events. Returns true if anything was removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.events.len();
        self.events.retain(|e| !e.has_expired_at(now));
        before != self.events.len()
    }

    pub fn current(&self) -> Option<&StatusEvent> {
        self.events.last()
    }

    pub fn in_progress_count(&self) -> usize {
        self.events.iter().filter(|e| e.in_progress).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub struct StatusBar<'a> {
    pub state: &'a StatusBarState,
    pub spinner_frame: usize,
    /// Shown when no status is live.
    pub hint: &'a str,
}

impl Component for StatusBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let line = match self.state.current() {
            None => Line::from(Span::styled(
                self.hint.to_string(),
                Style::default().fg(Color::DarkGray),
            )),
            Some(event) => {
                let (marker, style) = if event.failure {
                    ("✗", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                } else if event.in_progress {
                    (
                        SPINNER[self.spinner_frame % SPINNER.len()],
                        Style::default().fg(Color::Yellow),
                    )
                } else {
                    ("✓", Style::default().fg(Color::Green))
                };
                let mut spans = vec![
                    Span::styled(format!("{marker} "), style),
                    Span::styled(event.message.clone(), style),
                ];
                let others = self.state.in_progress_count() - usize::from(event.in_progress);
                if others > 0 {
                    spans.push(Span::styled(
                        format!("  (+{others} running)"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                Line::from(spans)
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}
