//! Key events and their session meaning.

use crossterm::event::{KeyCode, KeyModifiers};

/// What a key press asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Stop the session
    Cancel,
    /// Send a message now
    Trigger,
    /// No effect
    Ignore,
}

/// Key event representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code
    pub code: KeyCode,
    /// Modifier keys held
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    /// Create a new key event
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Plain character key without modifiers
    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    /// Key without modifiers
    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Esc, q or Ctrl+C
    pub fn is_cancel(&self) -> bool {
        self.code == KeyCode::Esc
            || (self.code == KeyCode::Char('q') && !self.modifiers.contains(KeyModifiers::CONTROL))
            || (self.code == KeyCode::Char('c') && self.modifiers.contains(KeyModifiers::CONTROL))
    }

    /// Space, Enter or s
    pub fn is_trigger(&self) -> bool {
        if self.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return false;
        }
        matches!(self.code, KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Char('s'))
    }

    pub fn action(&self) -> KeyAction {
        if self.is_cancel() {
            KeyAction::Cancel
        } else if self.is_trigger() {
            KeyAction::Trigger
        } else {
            KeyAction::Ignore
        }
    }
}

impl From<crossterm::event::KeyEvent> for KeyEvent {
    fn from(key: crossterm::event::KeyEvent) -> Self {
        Self::new(key.code, key.modifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_keys() {
        assert_eq!(KeyEvent::plain(KeyCode::Esc).action(), KeyAction::Cancel);
        assert_eq!(KeyEvent::char('q').action(), KeyAction::Cancel);
        assert_eq!(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL).action(),
            KeyAction::Cancel
        );
    }

    #[test]
    fn test_trigger_keys() {
        assert_eq!(KeyEvent::char(' ').action(), KeyAction::Trigger);
        assert_eq!(KeyEvent::plain(KeyCode::Enter).action(), KeyAction::Trigger);
        assert_eq!(KeyEvent::char('s').action(), KeyAction::Trigger);
    }

    #[test]
    fn test_other_keys_ignored() {
        assert_eq!(KeyEvent::char('c').action(), KeyAction::Ignore);
        assert_eq!(KeyEvent::char('x').action(), KeyAction::Ignore);
        assert_eq!(KeyEvent::plain(KeyCode::Tab).action(), KeyAction::Ignore);
        assert_eq!(KeyEvent::plain(KeyCode::Up).action(), KeyAction::Ignore);
        assert_eq!(
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL).action(),
            KeyAction::Ignore
        );
    }

    #[test]
    fn test_from_crossterm() {
        let ct = crossterm::event::KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        let key: KeyEvent = ct.into();
        assert!(key.is_cancel());
    }
}
