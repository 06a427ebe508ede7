use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::core::navigator::View;
use crate::tui::component::Component;
use crate::tui::components::{ContentPane, NodeList, StatusBar};
use crate::tui::{InputMode, TuiState};

const HELP: &str = "↑↓ select  ⏎/→ expand  ← back  r refresh  / filter  d delete  q quit";

pub fn draw_ui(frame: &mut Frame, view: &View, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min, Percentage};
    let [header_area, main_area, status_area] =
        Layout::vertical([Length(1), Min(0), Length(1)]).areas(frame.area());
    let [list_area, content_area] =
        Layout::horizontal([Percentage(40), Percentage(60)]).areas(main_area);

    frame.render_widget(Paragraph::new(header_line(view, tui)), header_area);

    NodeList {
        items: view.visible_items(),
        selection: view.selection,
        title: if view.title.is_empty() { "armtree" } else { view.title.as_str() },
        filter: &view.filter,
        busy: tui.busy > 0,
        list_state: &mut tui.list_state,
    }
    .render(frame, list_area);

    ContentPane {
        content: &view.content,
        state: &mut tui.content,
    }
    .render(frame, content_area);

    match &mut tui.mode {
        InputMode::Filter(input) => input.render(frame, status_area),
        InputMode::ConfirmDelete(node) => {
            let prompt = Line::from(vec![
                Span::styled(
                    format!("Delete {}? ", node.display),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::raw("y to confirm, any other key to cancel"),
            ]);
            frame.render_widget(Paragraph::new(prompt), status_area);
        }
        InputMode::Browse => StatusBar {
            state: &tui.status,
            spinner_frame,
            hint: HELP,
        }
        .render(frame, status_area),
    }
}

fn header_line(view: &View, tui: &TuiState) -> Line<'static> {
    let mut spans = vec![Span::styled(
        " armtree ",
        Style::default().fg(Color::Black).bg(Color::Cyan),
    )];
    if let Some(node) = &view.expanded_node {
        spans.push(Span::raw(format!(" {}", node.id)));
    }
    spans.push(Span::styled(
        format!("  depth {}", tui.history_depth),
        Style::default().fg(Color::DarkGray),
    ));
    if tui.busy > 0 {
        spans.push(Span::styled("  working…", Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}
