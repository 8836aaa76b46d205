use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    PageUp,
    PageDown,
    ToggleMark,
    MarkAll,
    ToggleMarkedOnly,
    CycleTagFilter,
    PickEntity,
    ExportShown,
    ExportMarked,
    StartQuery,
    SubmitQuery,
    ClearFilters,
    Backspace,
    InputChar(char),
    Quit,
    Noop,
}

/// Map a key to an action. While the query is being edited every printable
/// character is text; otherwise the command letters take precedence and any
/// other printable character starts a query.
pub fn action_for_key(key: KeyEvent, editing_query: bool) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::Noop,
        };
    }

    match key.code {
        KeyCode::Up => return Action::Move(Direction::Up),
        KeyCode::Down => return Action::Move(Direction::Down),
        KeyCode::Left => return Action::Move(Direction::Left),
        KeyCode::Right => return Action::Move(Direction::Right),
        KeyCode::PageUp => return Action::PageUp,
        KeyCode::PageDown => return Action::PageDown,
        KeyCode::Enter => return Action::SubmitQuery,
        KeyCode::Esc => return Action::ClearFilters,
        KeyCode::Backspace => return Action::Backspace,
        _ => {}
    }

    if editing_query {
        return match key.code {
            KeyCode::Char(c) => Action::InputChar(c),
            _ => Action::Noop,
        };
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char(' ') => Action::ToggleMark,
        KeyCode::Char('m') => Action::MarkAll,
        KeyCode::Char('s') => Action::ToggleMarkedOnly,
        KeyCode::Char('f') | KeyCode::Char('F') => Action::CycleTagFilter,
        KeyCode::Char('e') | KeyCode::Char('E') => Action::PickEntity,
        KeyCode::Char('x') => Action::ExportShown,
        KeyCode::Char('r') => Action::ExportMarked,
        KeyCode::Char('/') => Action::StartQuery,
        KeyCode::Char(c) => Action::InputChar(c),
        _ => Action::Noop,
    }
}

/// Blocking source of key presses. `None` means the poll timed out.
pub trait KeySource {
    fn next_key(&mut self) -> Result<Option<KeyEvent>>;
}

/// Terminal keyboard, polled with a fixed timeout so callers can redraw idle.
pub struct TerminalKeys {
    pub poll_interval: Duration,
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> Result<Option<KeyEvent>> {
        if !event::poll(self.poll_interval)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
            _ => Ok(None),
        }
    }
}
