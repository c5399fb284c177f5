//! Key bindings: normal and vim-style.

use crate::board::Direction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Confirm,
    Back,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter) and
/// vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') if no_mod => Action::Quit,
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Esc if no_mod => Action::Back,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::Move(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::Move(Direction::Right),
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::Move(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::Move(Direction::Down),
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Confirm,
        _ => Action::None,
    }
}
