//! Scripted key source for tests and demos.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use super::keys::KeyEvent;
use super::source::InputSource;

#[derive(Debug, Clone)]
enum Step {
    Key(KeyEvent),
    Fail(String),
}

/// Replays key presses at fixed offsets from its creation time.
///
/// Offsets are measured on the tokio clock, so paused-time tests see keys
/// arrive exactly when scripted. Clones share the same script.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    start: Instant,
    steps: Arc<Mutex<VecDeque<(Duration, Step)>>>,
}

impl Default for ScriptedInput {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            steps: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Make `key` available `at` after creation.
    pub fn key_at(self, at: Duration, key: KeyEvent) -> Self {
        self.push(at, Step::Key(key));
        self
    }

    /// Make the source fail `at` after creation.
    pub fn fail_at(self, at: Duration, message: impl Into<String>) -> Self {
        self.push(at, Step::Fail(message.into()));
        self
    }

    /// Steps not consumed yet.
    pub fn remaining(&self) -> usize {
        self.steps().len()
    }

    fn push(&self, at: Duration, step: Step) {
        let mut steps = self.steps();
        // Keep time order; equal offsets keep insertion order
        let index = steps.iter().position(|(t, _)| *t > at).unwrap_or(steps.len());
        steps.insert(index, (at, step));
    }

    fn steps(&self) -> MutexGuard<'_, VecDeque<(Duration, Step)>> {
        self.steps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InputSource for ScriptedInput {
    fn key_available(&mut self) -> io::Result<bool> {
        let elapsed = self.start.elapsed();
        match self.steps().front() {
            Some((at, _)) if *at > elapsed => Ok(false),
            Some((_, Step::Fail(message))) => Err(io::Error::other(message.clone())),
            Some((_, Step::Key(_))) => Ok(true),
            None => Ok(false),
        }
    }

    fn read_key(&mut self) -> io::Result<Option<KeyEvent>> {
        match self.steps().pop_front() {
            Some((_, Step::Key(key))) => Ok(Some(key)),
            Some((_, Step::Fail(message))) => Err(io::Error::other(message)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_keys_appear_at_their_offset() {
        let mut input = ScriptedInput::new().key_at(Duration::from_millis(100), KeyEvent::char('s'));
        assert!(!input.key_available().unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(input.key_available().unwrap());
        assert_eq!(input.read_key().unwrap(), Some(KeyEvent::char('s')));
        assert!(!input.key_available().unwrap());
        assert_eq!(input.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_script_is_sorted() {
        let mut input = ScriptedInput::new()
            .key_at(Duration::from_millis(50), KeyEvent::char('b'))
            .key_at(Duration::from_millis(10), KeyEvent::char('a'));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(input.read_key().unwrap(), Some(KeyEvent::char('a')));
        assert_eq!(input.read_key().unwrap(), Some(KeyEvent::char('b')));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_step() {
        let mut input = ScriptedInput::new().fail_at(Duration::ZERO, "boom");
        let err = input.key_available().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
