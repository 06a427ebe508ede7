//! # FilterInput Component
//!
//! One-line editor opened with `/`. Every keystroke emits the new filter
//! so the list narrows as the user types.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

#[derive(Debug, PartialEq, Eq)]
pub enum FilterEvent {
    Changed(String),
    /// Enter: keep the filter, leave the editor.
    Accepted,
    /// Esc: clear the filter, leave the editor.
    Cancelled,
}

#[derive(Debug, Default)]
pub struct FilterInput {
    pub text: String,
}

impl FilterInput {
    pub fn new(initial: &str) -> Self {
        Self {
            text: initial.to_string(),
        }
    }
}

impl EventHandler for FilterInput {
    type Event = FilterEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<FilterEvent> {
        match event {
            TuiEvent::InputChar(c) => {
                self.text.push(*c);
                Some(FilterEvent::Changed(self.text.clone()))
            }
            TuiEvent::Backspace => {
                self.text.pop()?;
                Some(FilterEvent::Changed(self.text.clone()))
            }
            TuiEvent::Expand => Some(FilterEvent::Accepted),
            TuiEvent::Escape => {
                self.text.clear();
                Some(FilterEvent::Cancelled)
            }
            _ => None,
        }
    }
}

impl Component for FilterInput {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(self.text.as_str()),
            Span::styled("█", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_emits_changes() {
        let mut input = FilterInput::default();
        assert_eq!(
            input.handle_event(&TuiEvent::InputChar('w')),
            Some(FilterEvent::Changed("w".into()))
        );
        assert_eq!(
            input.handle_event(&TuiEvent::InputChar('e')),
            Some(FilterEvent::Changed("we".into()))
        );
        assert_eq!(
            input.handle_event(&TuiEvent::Backspace),
            Some(FilterEvent::Changed("w".into()))
        );
    }

    #[test]
    fn test_backspace_on_empty_is_ignored() {
        let mut input = FilterInput::default();
        assert_eq!(input.handle_event(&TuiEvent::Backspace), None);
    }

    #[test]
    fn test_escape_clears() {
        let mut input = FilterInput::new("web");
        assert_eq!(input.handle_event(&TuiEvent::Escape), Some(FilterEvent::Cancelled));
        assert!(input.text.is_empty());
        assert_eq!(input.handle_event(&TuiEvent::Expand), Some(FilterEvent::Accepted));
    }
}
