//! Non-blocking key sources.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use super::keys::KeyEvent;

/// A source of discrete key presses that never blocks the caller.
pub trait InputSource: Send {
    /// Whether an event can be read right now.
    fn key_available(&mut self) -> io::Result<bool>;

    /// Read the available event. `None` when it was not a key press
    /// (resize, mouse, key release...).
    fn read_key(&mut self) -> io::Result<Option<KeyEvent>>;
}

/// Key source backed by the process terminal.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    pub fn new() -> Self {
        Self
    }
}

impl InputSource for TerminalInput {
    fn key_available(&mut self) -> io::Result<bool> {
        event::poll(Duration::ZERO)
    }

    fn read_key(&mut self) -> io::Result<Option<KeyEvent>> {
        match event::read()? {
            // Only handle key press events, not release
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key.into())),
            _ => Ok(None),
        }
    }
}

/// Keeps the terminal in raw mode while alive.
///
/// Raw mode delivers single key presses without waiting for Enter; dropping
/// the guard restores the terminal on every exit path.
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            log::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}
