//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the current
//! [`View`](crate::core::navigator::View) and translates keyboard events
//! into navigator calls.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Threading
//!
//! The loop itself is synchronous. Navigator operations that await
//! (expand, back, refresh, delete) are spawned on the tokio runtime and
//! report back over a std `mpsc` channel; the loop never blocks on them
//! and keeps drawing snapshots of the view while they run. Status events
//! arrive through a bus subscription drained once per frame.
//!
//! ## Redraw Strategy
//!
//! - **Busy** (an operation in flight): draws every ~80ms so the spinner moves.
//! - **Idle**: sleeps up to 500ms, redraws only on input, bus traffic, or
//!   when an expired status is pruned.

mod component;
mod components;
mod event;
mod ui;

use std::future::Future;
use std::io::{self, stdout};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use log::{debug, error, info, warn};
use ratatui::widgets::ListState;

use crate::core::bus::{BusEvent, Topic};
use crate::core::navigator::{NavError, Navigator};
use crate::core::node::TreeNode;
use crate::tui::component::EventHandler;
use crate::tui::components::{ContentPaneState, FilterEvent, FilterInput, StatusBarState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const PAGE_STEP: usize = 10;
const CONTENT_SCROLL_STEP: u16 = 3;

/// Modal input mode: determines how keyboard events are interpreted.
#[derive(Debug)]
pub enum InputMode {
    Browse,
    /// Typing narrows the list. Enter keeps the filter, Esc clears it.
    Filter(FilterInput),
    /// Waiting for `y` before deleting this node.
    ConfirmDelete(TreeNode),
}

/// TUI-specific presentation state (not part of core navigation state)
pub struct TuiState {
    pub list_state: ListState,
    pub content: ContentPaneState,
    pub status: StatusBarState,
    pub mode: InputMode,
    /// Navigator operations spawned and not yet reported back.
    pub busy: usize,
    pub history_depth: usize,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            list_state: ListState::default(),
            content: ContentPaneState::default(),
            status: StatusBarState::new(),
            mode: InputMode::Browse,
            busy: 0,
            history_depth: 0,
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports from spawned navigator operations.
#[derive(Debug)]
enum UiMessage {
    Finished { history_depth: usize },
    /// An invariant violation. The loop exits.
    Fatal(String),
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> io::Result<Self> {
        execute!(stdout(), Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show);
    }
}

/// Runs one navigator operation on the runtime and reports back to the loop.
fn spawn_op<F, Fut>(
    navigator: &Arc<Navigator>,
    tx: &mpsc::Sender<UiMessage>,
    tui: &mut TuiState,
    label: &'static str,
    op: F,
) where
    F: FnOnce(Arc<Navigator>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), NavError>> + Send + 'static,
{
    debug!("Spawning navigator operation: {}", label);
    tui.busy += 1;
    let navigator = navigator.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = op(navigator.clone()).await;
        let message = match result {
            Err(e) if e.is_invariant_violation() => UiMessage::Fatal(e.to_string()),
            Err(NavError::NothingSelected) => {
                debug!("{}: nothing selected", label);
                UiMessage::Finished {
                    history_depth: navigator.history_len().await,
                }
            }
            Err(e) => {
                // Expander failures already produced their own status.
                if !matches!(e, NavError::Expander(_)) {
                    navigator.bus().send_error(&e);
                }
                warn!("{} failed: {}", label, e);
                UiMessage::Finished {
                    history_depth: navigator.history_len().await,
                }
            }
            Ok(()) => UiMessage::Finished {
                history_depth: navigator.history_len().await,
            },
        };
        if tx.send(message).is_err() {
            warn!("{} finished after the UI loop exited", label);
        }
    });
}

/// Applies one key event. Returns true when the user asked to quit.
fn handle_event(
    event: TuiEvent,
    navigator: &Arc<Navigator>,
    tx: &mpsc::Sender<UiMessage>,
    tui: &mut TuiState,
) -> bool {
    if matches!(event, TuiEvent::ForceQuit) {
        return true;
    }
    if matches!(event, TuiEvent::Resize) {
        return false;
    }

    match std::mem::replace(&mut tui.mode, InputMode::Browse) {
        InputMode::Filter(mut input) => {
            match input.handle_event(&event) {
                Some(FilterEvent::Changed(text)) => navigator.set_filter(&text),
                Some(FilterEvent::Accepted) => return false,
                Some(FilterEvent::Cancelled) => {
                    navigator.set_filter("");
                    return false;
                }
                None => {}
            }
            tui.mode = InputMode::Filter(input);
            false
        }
        InputMode::ConfirmDelete(node) => {
            if event == TuiEvent::InputChar('y') {
                info!("Delete confirmed for {}", node.id);
                spawn_op(navigator, tx, tui, "delete", move |nav| async move {
                    nav.delete(node).await
                });
            } else {
                debug!("Delete of {} cancelled", node.id);
            }
            false
        }
        InputMode::Browse => handle_browse(event, navigator, tx, tui),
    }
}

fn handle_browse(
    event: TuiEvent,
    navigator: &Arc<Navigator>,
    tx: &mpsc::Sender<UiMessage>,
    tui: &mut TuiState,
) -> bool {
    let selection = navigator.snapshot().selection;
    match event {
        TuiEvent::InputChar('q') => return true,
        TuiEvent::CursorUp => navigator.change_selection(selection.saturating_sub(1)),
        TuiEvent::CursorDown => navigator.change_selection(selection + 1),
        TuiEvent::PageUp => navigator.change_selection(selection.saturating_sub(PAGE_STEP)),
        TuiEvent::PageDown => navigator.change_selection(selection + PAGE_STEP),
        TuiEvent::Home => navigator.change_selection(0),
        TuiEvent::End => navigator.change_selection(usize::MAX),
        TuiEvent::ScrollContentUp => tui.content.scroll_up(CONTENT_SCROLL_STEP),
        TuiEvent::ScrollContentDown => tui.content.scroll_down(CONTENT_SCROLL_STEP),
        TuiEvent::Expand => spawn_op(navigator, tx, tui, "expand", |nav| async move {
            nav.expand_current_selection().await.map(|_| ())
        }),
        TuiEvent::Back | TuiEvent::Backspace => spawn_op(navigator, tx, tui, "back", |nav| async move {
            nav.go_back().await;
            Ok(())
        }),
        TuiEvent::InputChar('r') => spawn_op(navigator, tx, tui, "refresh", |nav| async move {
            nav.refresh().await.map(|_| ())
        }),
        TuiEvent::InputChar('/') => {
            tui.mode = InputMode::Filter(FilterInput::new(&navigator.snapshot().filter));
        }
        TuiEvent::Escape => navigator.set_filter(""),
        TuiEvent::InputChar('d') => match navigator.snapshot().selected() {
            Some(node) if node.delete_url.is_some() => {
                tui.mode = InputMode::ConfirmDelete(node.clone());
            }
            Some(node) => {
                navigator
                    .bus()
                    .send_failure(format!("{} cannot be deleted", node.display));
            }
            None => {}
        },
        _ => {}
    }
    false
}

/// Runs the interactive loop until the user quits or an invariant is violated.
///
/// `root` is loaded before the first key is read.
pub fn run(navigator: Arc<Navigator>, root: TreeNode) -> io::Result<()> {
    let mut tui = TuiState::new();
    let mut status_sub = navigator.bus().subscribe(Topic::Status);
    let mut navigated_sub = navigator.bus().subscribe(Topic::Navigated);
    let (tx, rx) = mpsc::channel();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    spawn_op(&navigator, &tx, &mut tui, "load root", move |nav| async move {
        nav.load_root(root).await.map(|_| ())
    });

    let start_time = Instant::now();
    let mut needs_redraw = true;
    let mut fatal: Option<String> = None;

    loop {
        if tui.busy > 0 {
            needs_redraw = true;
        }
        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            let view = navigator.snapshot();
            terminal.draw(|f| ui::draw_ui(f, &view, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if tui.busy > 0 {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(500)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(event, &navigator, &tx, &mut tui) {
                should_quit = true;
                break;
            }
        }
        if should_quit {
            info!("Quit requested");
            break;
        }

        while let Ok(message) = rx.try_recv() {
            needs_redraw = true;
            tui.busy = tui.busy.saturating_sub(1);
            match message {
                UiMessage::Finished { history_depth } => tui.history_depth = history_depth,
                UiMessage::Fatal(reason) => {
                    error!("Stopping on invariant violation: {}", reason);
                    fatal = Some(reason);
                }
            }
        }
        if fatal.is_some() {
            break;
        }

        while let Some(event) = status_sub.try_recv() {
            if let BusEvent::Status(status) = event {
                tui.status.ingest(status);
                needs_redraw = true;
            }
        }
        while navigated_sub.try_recv().is_some() {
            needs_redraw = true;
        }
        if tui.status.prune(Utc::now()) {
            needs_redraw = true;
        }
    }

    let dropped = status_sub.dropped();
    if dropped > 0 {
        warn!("Status bar missed {} event(s) while the loop was busy", dropped);
    }
    ratatui::restore();

    match fatal {
        Some(reason) => Err(io::Error::other(reason)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::EventBus;
    use crate::core::expander::Expander;
    use crate::core::navigator::DEFAULT_EXPAND_TIMEOUT;
    use crate::test_support::{ScriptedExpander, children};

    fn navigator() -> Arc<Navigator> {
        let lister: Arc<dyn Expander> = Arc::new(
            ScriptedExpander::new("lister")
                .with_nodes_for("root", children("sub", 3))
                .with_nodes_for("sub-0", children("rg", 2)),
        );
        Arc::new(Navigator::new(EventBus::new(), vec![lister], DEFAULT_EXPAND_TIMEOUT))
    }

    async fn loaded() -> Arc<Navigator> {
        let nav = navigator();
        nav.load_root(TreeNode::new("root", "Subscriptions")).await.unwrap();
        nav
    }

    #[tokio::test]
    async fn test_cursor_keys_move_selection() {
        let nav = loaded().await;
        let (tx, _rx) = mpsc::channel();
        let mut tui = TuiState::new();

        handle_event(TuiEvent::CursorDown, &nav, &tx, &mut tui);
        handle_event(TuiEvent::CursorDown, &nav, &tx, &mut tui);
        assert_eq!(nav.snapshot().selection, 2);

        handle_event(TuiEvent::End, &nav, &tx, &mut tui);
        assert_eq!(nav.snapshot().selection, 2);

        handle_event(TuiEvent::Home, &nav, &tx, &mut tui);
        assert_eq!(nav.snapshot().selection, 0);
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let nav = loaded().await;
        let (tx, _rx) = mpsc::channel();
        let mut tui = TuiState::new();

        assert!(handle_event(TuiEvent::InputChar('q'), &nav, &tx, &mut tui));
        assert!(handle_event(TuiEvent::ForceQuit, &nav, &tx, &mut tui));
    }

    #[tokio::test]
    async fn test_filter_mode_narrows_and_escape_clears() {
        let nav = loaded().await;
        let (tx, _rx) = mpsc::channel();
        let mut tui = TuiState::new();

        handle_event(TuiEvent::InputChar('/'), &nav, &tx, &mut tui);
        assert!(matches!(tui.mode, InputMode::Filter(_)));

        // 'q' is text while filtering, not quit.
        assert!(!handle_event(TuiEvent::InputChar('q'), &nav, &tx, &mut tui));
        assert!(nav.snapshot().visible_items().is_empty());

        handle_event(TuiEvent::Escape, &nav, &tx, &mut tui);
        assert!(matches!(tui.mode, InputMode::Browse));
        assert_eq!(nav.snapshot().visible_items().len(), 3);
    }

    #[tokio::test]
    async fn test_expand_reports_history_depth() {
        let nav = loaded().await;
        let (tx, rx) = mpsc::channel();
        let mut tui = TuiState::new();

        handle_event(TuiEvent::Expand, &nav, &tx, &mut tui);
        assert_eq!(tui.busy, 1);

        let message = tokio::task::spawn_blocking(move || rx.recv().unwrap())
            .await
            .unwrap();
        assert!(matches!(message, UiMessage::Finished { history_depth: 1 }));
        assert_eq!(nav.snapshot().title, "sub-0");
    }

    #[tokio::test]
    async fn test_confirmed_delete_hits_prompted_node() {
        let deletable = children("rg", 3)
            .into_iter()
            .map(|n| {
                let url = format!("/groups/{}", n.id);
                n.with_delete_url(url)
            })
            .collect();
        let scripted = ScriptedExpander::new("lister").with_nodes_for("root", deletable);
        let deletions = scripted.deletions();
        let lister: Arc<dyn Expander> = Arc::new(scripted);
        let nav = Arc::new(Navigator::new(EventBus::new(), vec![lister], DEFAULT_EXPAND_TIMEOUT));
        nav.load_root(TreeNode::new("root", "Subscriptions")).await.unwrap();
        let (tx, rx) = mpsc::channel();
        let mut tui = TuiState::new();

        nav.change_selection(2);
        handle_event(TuiEvent::InputChar('d'), &nav, &tx, &mut tui);
        assert!(matches!(&tui.mode, InputMode::ConfirmDelete(node) if node.id == "rg-2"));

        // The cursor moves before the user answers the prompt.
        nav.change_selection(0);
        handle_event(TuiEvent::InputChar('y'), &nav, &tx, &mut tui);

        let message = tokio::task::spawn_blocking(move || rx.recv().unwrap())
            .await
            .unwrap();
        assert!(matches!(message, UiMessage::Finished { .. }));
        assert_eq!(*deletions.lock().unwrap(), vec!["rg-2".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_needs_deletable_node() {
        let nav = loaded().await;
        let (tx, _rx) = mpsc::channel();
        let mut tui = TuiState::new();
        let mut status = nav.bus().subscribe(Topic::Status);

        handle_event(TuiEvent::InputChar('d'), &nav, &tx, &mut tui);

        assert!(matches!(tui.mode, InputMode::Browse));
        assert!(matches!(status.try_recv(), Some(BusEvent::Status(s)) if s.failure));
    }
}
