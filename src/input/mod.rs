//! Keyboard input for a running session.
//!
//! This module provides:
//! - `KeyEvent` / `KeyAction`: key presses and what they mean to the session
//! - `InputSource`: non-blocking key source, with a crossterm implementation
//! - `InputMonitor`: the polling task that turns keys into triggers or a stop

mod keys;
mod monitor;
mod scripted;
mod source;

pub use keys::{KeyAction, KeyEvent};
pub use monitor::{DEFAULT_POLL_INTERVAL, InputMonitor, MonitorExit};
pub use scripted::ScriptedInput;
pub use source::{InputSource, RawModeGuard, TerminalInput};
