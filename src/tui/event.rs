use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

/// TUI-specific input events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    /// Ctrl+C, quits from any mode
    ForceQuit,
    CursorUp,
    CursorDown,
    PageUp,
    PageDown,
    Home,
    End,
    /// Enter or Right: expand the selected node
    Expand,
    /// Left: go back one page
    Back,
    Backspace,
    Escape,
    InputChar(char),
    /// Shift+Up / Shift+Down scroll the content pane
    ScrollContentUp,
    ScrollContentDown,
    Resize,
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(Duration::ZERO)
}

/// Poll for an event, blocking up to `timeout`.
pub fn poll_event_timeout(timeout: Duration) -> Option<TuiEvent> {
    match event::poll(timeout) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            log::warn!("Terminal poll failed: {}", e);
            return None;
        }
    }
    match event::read() {
        Ok(Event::Key(key_event)) if key_event.kind != KeyEventKind::Release => {
            log::debug!(
                "Key event: {:?} with modifiers {:?}",
                key_event.code,
                key_event.modifiers
            );
            map_key(key_event.modifiers, key_event.code)
        }
        Ok(Event::Resize(_, _)) => Some(TuiEvent::Resize),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Terminal read failed: {}", e);
            None
        }
    }
}

fn map_key(modifiers: KeyModifiers, code: KeyCode) -> Option<TuiEvent> {
    match (modifiers, code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(TuiEvent::ForceQuit),
        (KeyModifiers::SHIFT, KeyCode::Up) => Some(TuiEvent::ScrollContentUp),
        (KeyModifiers::SHIFT, KeyCode::Down) => Some(TuiEvent::ScrollContentDown),
        (_, KeyCode::Up) => Some(TuiEvent::CursorUp),
        (_, KeyCode::Down) => Some(TuiEvent::CursorDown),
        (_, KeyCode::PageUp) => Some(TuiEvent::PageUp),
        (_, KeyCode::PageDown) => Some(TuiEvent::PageDown),
        (_, KeyCode::Home) => Some(TuiEvent::Home),
        (_, KeyCode::End) => Some(TuiEvent::End),
        (_, KeyCode::Enter | KeyCode::Right) => Some(TuiEvent::Expand),
        (_, KeyCode::Left) => Some(TuiEvent::Back),
        (_, KeyCode::Backspace) => Some(TuiEvent::Backspace),
        (_, KeyCode::Esc) => Some(TuiEvent::Escape),
        (_, KeyCode::Char(c)) => Some(TuiEvent::InputChar(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        assert_eq!(
            map_key(KeyModifiers::CONTROL, KeyCode::Char('c')),
            Some(TuiEvent::ForceQuit)
        );
        assert_eq!(map_key(KeyModifiers::NONE, KeyCode::Char('c')), Some(TuiEvent::InputChar('c')));
        assert_eq!(map_key(KeyModifiers::NONE, KeyCode::Right), Some(TuiEvent::Expand));
        assert_eq!(map_key(KeyModifiers::NONE, KeyCode::Enter), Some(TuiEvent::Expand));
        assert_eq!(map_key(KeyModifiers::SHIFT, KeyCode::Down), Some(TuiEvent::ScrollContentDown));
        assert_eq!(map_key(KeyModifiers::NONE, KeyCode::F(5)), None);
    }
}
