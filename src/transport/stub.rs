//! In-memory transport with scripted failures, for tests and embedders.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{Connection, Connector};
use crate::connection::ConnectionDescriptor;
use crate::error::{PulseError, Result, TransportError};
use crate::message::Message;
use crate::signal::CancellationSignal;

/// One call to `send` as seen by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRecord {
    /// 1-based count of send calls on this stub
    pub attempt: u64,
    /// Sequence number decoded from the payload, if it was a message
    pub sequence: Option<u64>,
    /// Offset from stub creation when the call started
    pub started: Duration,
    /// Offset from stub creation when the call returned
    pub finished: Option<Duration>,
    pub succeeded: bool,
}

/// Snapshot of what the stub has observed.
#[derive(Debug, Clone, Default)]
pub struct StubStats {
    pub opens: usize,
    pub closes: usize,
    pub max_in_flight: usize,
    pub sends: Vec<SendRecord>,
}

impl StubStats {
    pub fn attempts(&self) -> usize {
        self.sends.len()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.sends.iter().filter_map(|s| s.sequence).collect()
    }
}

#[derive(Debug)]
struct StubState {
    start: Instant,
    fail_on: HashSet<u64>,
    send_duration: Duration,
    open_error: Option<String>,
    close_error: Option<String>,
    in_flight: usize,
    stats: StubStats,
}

/// Connector whose connections record every call and fail on chosen attempts.
///
/// Clones share state, so a test can keep one handle and pass another to
/// the session.
#[derive(Debug, Clone)]
pub struct StubConnector {
    state: Arc<Mutex<StubState>>,
}

impl Default for StubConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl StubConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                start: Instant::now(),
                fail_on: HashSet::new(),
                send_duration: Duration::ZERO,
                open_error: None,
                close_error: None,
                in_flight: 0,
                stats: StubStats::default(),
            })),
        }
    }

    /// Fail the given 1-based send attempts.
    pub fn fail_on(self, attempts: impl IntoIterator<Item = u64>) -> Self {
        self.lock().fail_on.extend(attempts);
        self
    }

    /// Make every send take `duration` on the tokio clock.
    pub fn send_duration(self, duration: Duration) -> Self {
        self.lock().send_duration = duration;
        self
    }

    /// Make `open` fail.
    pub fn fail_open(self, message: impl Into<String>) -> Self {
        self.lock().open_error = Some(message.into());
        self
    }

    /// Make `close` fail.
    pub fn fail_close(self, message: impl Into<String>) -> Self {
        self.lock().close_error = Some(message.into());
        self
    }

    pub fn stats(&self) -> StubStats {
        self.lock().stats.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn open(&self, _descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        let mut state = self.lock();
        if let Some(message) = &state.open_error {
            return Err(PulseError::Connect(message.clone()));
        }
        state.stats.opens += 1;
        Ok(Box::new(StubConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct StubConnection {
    state: Arc<Mutex<StubState>>,
}

impl StubConnection {
    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connection for StubConnection {
    async fn send(&mut self, payload: &[u8], abort: &CancellationSignal) -> std::result::Result<(), TransportError> {
        let sequence = serde_json::from_slice::<Message>(payload).ok().map(|m| m.sequence);
        let (attempt, duration, fail) = {
            let mut state = self.lock();
            state.in_flight += 1;
            state.stats.max_in_flight = state.stats.max_in_flight.max(state.in_flight);
            let attempt = state.stats.sends.len() as u64 + 1;
            let started = state.start.elapsed();
            state.stats.sends.push(SendRecord {
                attempt,
                sequence,
                started,
                finished: None,
                succeeded: false,
            });
            (attempt, state.send_duration, state.fail_on.contains(&attempt))
        };

        let completed = if duration.is_zero() {
            !abort.is_cancelled()
        } else {
            tokio::select! {
                biased;
                _ = abort.cancelled() => false,
                _ = tokio::time::sleep(duration) => true,
            }
        };
        let result = match (completed, fail) {
            (false, _) => Err(TransportError::Aborted),
            (true, true) => Err(TransportError::Rejected(format!("stub failure on attempt {}", attempt))),
            (true, false) => Ok(()),
        };

        let mut state = self.lock();
        state.in_flight -= 1;
        let finished = state.start.elapsed();
        if let Some(record) = state.stats.sends.iter_mut().find(|r| r.attempt == attempt) {
            record.finished = Some(finished);
            record.succeeded = result.is_ok();
        }
        result
    }

    async fn close(&mut self) -> std::result::Result<(), TransportError> {
        let mut state = self.lock();
        state.stats.closes += 1;
        match &state.close_error {
            Some(message) => Err(TransportError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor::parse("HostName=h;DeviceId=d").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stub_records_sends_and_failures() {
        let stub = StubConnector::new().fail_on([2]);
        let mut conn = stub.open(&descriptor()).await.unwrap();
        let abort = CancellationSignal::new();

        for seq in 1..=3 {
            let payload = Message::new(seq, "o").to_payload().unwrap();
            let result = conn.send(&payload, &abort).await;
            assert_eq!(result.is_ok(), seq != 2);
        }
        conn.close().await.unwrap();

        let stats = stub.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.closes, 1);
        assert_eq!(stats.attempts(), 3);
        assert_eq!(stats.sequences(), vec![1, 2, 3]);
        assert_eq!(stats.max_in_flight, 1);
        assert!(!stats.sends[1].succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stub_abort_interrupts_slow_send() {
        let stub = StubConnector::new().send_duration(Duration::from_secs(60));
        let mut conn = stub.open(&descriptor()).await.unwrap();
        let abort = CancellationSignal::new();

        let trigger = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = conn.send(b"{}", &abort).await.unwrap_err();
        assert!(err.is_aborted());
        assert_eq!(stub.stats().sends[0].sequence, None);
    }

    #[tokio::test]
    async fn test_stub_open_failure() {
        let stub = StubConnector::new().fail_open("no route");
        assert!(matches!(stub.open(&descriptor()).await, Err(PulseError::Connect(_))));
        assert_eq!(stub.stats().opens, 0);
    }

    #[tokio::test]
    async fn test_stub_close_failure_still_counted() {
        let stub = StubConnector::new().fail_close("already gone");
        let mut conn = stub.open(&descriptor()).await.unwrap();
        assert!(conn.close().await.is_err());
        assert_eq!(stub.stats().closes, 1);
    }
}
