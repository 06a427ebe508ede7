//! # ContentPane Component
//!
//! Right pane: the primary content of the current view, scrollable.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::core::node::{Content, ContentType};
use crate::tui::component::Component;

/// Scroll offset, reset whenever the content changes.
#[derive(Debug, Default)]
pub struct ContentPaneState {
    pub scroll: u16,
    shown: Option<Content>,
}

impl ContentPaneState {
    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    fn sync(&mut self, content: &Content) {
        if self.shown.as_ref() != Some(content) {
            self.shown = Some(content.clone());
            self.scroll = 0;
        }
    }
}

pub struct ContentPane<'a> {
    pub content: &'a Content,
    pub state: &'a mut ContentPaneState,
}

/// Minimal JSON colouring: keys cyan, everything else default.
fn highlight_line(line: &str, content_type: ContentType) -> Line<'_> {
    if content_type != ContentType::Json {
        return Line::raw(line);
    }
    let trimmed = line.trim_start();
    if trimmed.starts_with('"')
        && let Some(colon) = trimmed.find("\":")
    {
        let indent = line.len() - trimmed.len();
        let key_end = indent + colon + 1;
        return Line::from(vec![
            Span::raw(&line[..indent]),
            Span::styled(&line[indent..key_end], Style::default().fg(Color::Cyan)),
            Span::raw(&line[key_end..]),
        ]);
    }
    Line::raw(line)
}

impl Component for ContentPane<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.state.sync(self.content);

        let lines: Vec<Line> = self
            .content
            .text
            .lines()
            .map(|l| highlight_line(l, self.content.content_type))
            .collect();
        let max_scroll = (lines.len() as u16).saturating_sub(area.height.saturating_sub(2));
        self.state.scroll = self.state.scroll.min(max_scroll);

        let title = if self.content.text.is_empty() {
            " Content ".to_string()
        } else {
            format!(" Content [{}] ", self.content.content_type.label())
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::bordered().title(title))
            .scroll((self.state.scroll, 0));
        frame.render_widget(paragraph, area);
    }
}
