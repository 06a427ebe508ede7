//! # NodeList Component
//!
//! Left pane: the filter-visible items of the current view with the
//! selection highlighted. Stateless apart from ratatui's `ListState`,
//! which keeps the selected row scrolled into view.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState};

use crate::core::node::{NodeKind, TreeNode};
use crate::tui::component::Component;

pub struct NodeList<'a> {
    pub items: Vec<&'a TreeNode>,
    pub selection: usize,
    pub title: &'a str,
    pub filter: &'a str,
    /// Dims the list while an operation holds the navigator.
    pub busy: bool,
    pub list_state: &'a mut ListState,
}

fn kind_style(kind: NodeKind) -> Style {
    match kind {
        NodeKind::Root => Style::default(),
        NodeKind::Subscription => Style::default().fg(Color::Cyan),
        NodeKind::ResourceGroup => Style::default().fg(Color::Yellow),
        NodeKind::Resource => Style::default().fg(Color::White),
    }
}

fn item_line(node: &TreeNode) -> Line<'_> {
    let mut spans = Vec::with_capacity(3);
    if !node.status_indicator.is_empty() {
        spans.push(Span::styled(
            format!("{} ", node.status_indicator),
            Style::default().fg(Color::Red),
        ));
    }
    spans.push(Span::styled(node.display.as_str(), kind_style(node.kind)));
    if let Some(resource_type) = node.metadata.get("type") {
        let short = resource_type.rsplit('/').next().unwrap_or(resource_type);
        spans.push(Span::styled(
            format!("  {short}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// "Title (filter: abc)" for the pane border.
pub fn list_title(title: &str, filter: &str, shown: usize) -> String {
    if filter.is_empty() {
        format!(" {title} ({shown}) ")
    } else {
        format!(" {title} ({shown}, filter: {filter}) ")
    }
}

impl Component for NodeList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .items
            .iter()
            .map(|node| ListItem::new(item_line(node)))
            .collect();
        let count = items.len();

        let mut border = Style::default();
        if self.busy {
            border = border.add_modifier(Modifier::DIM);
        }
        let list = List::new(items)
            .block(
                Block::bordered()
                    .title(list_title(self.title, self.filter, count))
                    .border_style(border),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        self.list_state
            .select(if count == 0 { None } else { Some(self.selection.min(count - 1)) });
        frame.render_stateful_widget(list, area, &mut *self.list_state);
    }
}
