//! Send loop implementation.
//!
//! The loop sends message #1 straight away, then alternates between waiting
//! on the trigger source and sending. Transport failures are reported and
//! the loop carries on; only cancellation stops it. A send in flight is
//! never interrupted by cancellation, only by the abort token.
//!
//! The loop borrows the connection per send; closing it is the session's job.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::message::{Message, SequenceCounter};
use crate::report::{AttemptReport, Reporter, SendOutcome};
use crate::signal::CancellationSignal;
use crate::transport::SharedConnection;
use crate::trigger::{Fire, TriggerSource};

/// Send loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not started yet
    Idle,
    /// About to build and send the next message
    Sending,
    /// Waiting for a timer or manual trigger
    AwaitingTrigger,
    /// Terminal; no further sends
    Cancelled,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Cancelled)
    }
}

/// Counters for one session's send attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub attempts: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// The last send was cut short by the abort token
    pub aborted: bool,
}

pub struct SendLoop {
    connection: SharedConnection,
    trigger: TriggerSource,
    signal: CancellationSignal,
    abort: CancellationSignal,
    reporter: Arc<dyn Reporter>,
    origin: String,
    sequence: SequenceCounter,
    state: LoopState,
    report: LoopReport,
}

impl SendLoop {
    pub fn new(
        connection: SharedConnection,
        trigger: TriggerSource,
        signal: CancellationSignal,
        abort: CancellationSignal,
        reporter: Arc<dyn Reporter>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            trigger,
            signal,
            abort,
            reporter,
            origin: origin.into(),
            sequence: SequenceCounter::new(),
            state: LoopState::Idle,
            report: LoopReport::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn report(&self) -> &LoopReport {
        &self.report
    }

    /// Perform one transition and return the new state.
    pub async fn step(&mut self) -> LoopState {
        self.state = match self.state {
            LoopState::Idle => {
                if self.signal.is_cancelled() {
                    info!("Cancelled before the first send");
                    LoopState::Cancelled
                } else {
                    LoopState::Sending
                }
            }
            LoopState::Sending => self.send_next().await,
            LoopState::AwaitingTrigger => match self.trigger.next_fire(Instant::now()).await {
                Fire::Cancelled => LoopState::Cancelled,
                Fire::Timer | Fire::Manual => LoopState::Sending,
            },
            LoopState::Cancelled => LoopState::Cancelled,
        };
        self.state
    }

    /// Run until cancelled.
    pub async fn run(mut self) -> LoopReport {
        info!("Send loop started (delay {:?})", self.trigger.delay());
        while !self.state.is_terminal() {
            self.step().await;
        }
        info!(
            "Send loop stopped after {} attempts ({} ok, {} failed)",
            self.report.attempts, self.report.succeeded, self.report.failed
        );
        self.report
    }

    async fn send_next(&mut self) -> LoopState {
        let sequence = self.sequence.advance();
        self.report.attempts += 1;

        let message = Message::new(sequence, self.origin.as_str());
        debug!("Sending message {} at {}", sequence, message.timestamp);
        let result = match message.to_payload() {
            Ok(payload) => {
                let mut connection = self.connection.lock().await;
                connection.send(&payload, &self.abort).await
            }
            Err(e) => Err(e),
        };

        let (outcome, next) = match result {
            Ok(()) => {
                self.report.succeeded += 1;
                (SendOutcome::Success, LoopState::AwaitingTrigger)
            }
            Err(e) if e.is_aborted() => {
                warn!("Message {} aborted during shutdown", sequence);
                self.report.aborted = true;
                (SendOutcome::Aborted, LoopState::Cancelled)
            }
            Err(e) => {
                warn!("Message {} failed: {}", sequence, e);
                self.report.failed += 1;
                (SendOutcome::Failure(e.to_string()), LoopState::AwaitingTrigger)
            }
        };

        self.reporter.attempt(&AttemptReport::new(sequence, outcome));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionDescriptor;
    use crate::report::RecordingReporter;
    use crate::transport::{Connector, StubConnector};
    use crate::trigger::{self, ManualTrigger};
    use std::time::Duration;

    struct Harness {
        send_loop: SendLoop,
        manual: ManualTrigger,
        signal: CancellationSignal,
        abort: CancellationSignal,
        reporter: Arc<RecordingReporter>,
        stub: StubConnector,
    }

    async fn harness(stub: StubConnector, delay: Duration) -> Harness {
        let descriptor = ConnectionDescriptor::parse("HostName=h;DeviceId=d").unwrap();
        let connection = Arc::new(tokio::sync::Mutex::new(stub.open(&descriptor).await.unwrap()));
        let signal = CancellationSignal::new();
        let abort = CancellationSignal::new();
        let (manual, source) = trigger::channel(delay, signal.clone());
        let reporter = Arc::new(RecordingReporter::new());
        let send_loop = SendLoop::new(
            connection,
            source,
            signal.clone(),
            abort.clone(),
            Arc::clone(&reporter) as Arc<dyn Reporter>,
            "test-host",
        );
        Harness {
            send_loop,
            manual,
            signal,
            abort,
            reporter,
            stub,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let mut h = harness(StubConnector::new(), Duration::from_millis(1000)).await;
        assert_eq!(h.send_loop.state(), LoopState::Idle);

        assert_eq!(h.send_loop.step().await, LoopState::Sending);
        assert_eq!(h.stub.stats().attempts(), 0);

        assert_eq!(h.send_loop.step().await, LoopState::AwaitingTrigger);
        assert_eq!(h.stub.stats().attempts(), 1);

        h.manual.request();
        assert_eq!(h.send_loop.step().await, LoopState::Sending);

        h.signal.cancel();
        // A decided send still goes out; cancellation only blocks the next one
        assert_eq!(h.send_loop.step().await, LoopState::AwaitingTrigger);
        assert_eq!(h.send_loop.step().await, LoopState::Cancelled);
        assert_eq!(h.send_loop.step().await, LoopState::Cancelled);
        assert_eq!(h.stub.stats().attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_send_is_immediate() {
        let mut h = harness(StubConnector::new(), Duration::from_secs(60)).await;
        let start = Instant::now();
        h.send_loop.step().await;
        h.send_loop.step().await;
        assert_eq!(h.reporter.sequences(), vec![1]);
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_sends_nothing() {
        let h = harness(StubConnector::new(), Duration::from_millis(100)).await;
        h.signal.cancel();
        let report = h.send_loop.run().await;
        assert_eq!(report, LoopReport::default());
        assert_eq!(h.stub.stats().attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_reported_and_loop_continues() {
        let h = harness(StubConnector::new().fail_on([2]), Duration::from_millis(100)).await;
        let signal = h.signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            signal.cancel();
        });

        let report = h.send_loop.run().await;
        assert_eq!(report.attempts, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(h.reporter.sequences(), vec![1, 2, 3, 4]);
        assert!(matches!(h.reporter.outcomes()[1], SendOutcome::Failure(ref r) if r.contains("attempt 2")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_ends_loop_with_aborted_report() {
        let h = harness(
            StubConnector::new().send_duration(Duration::from_secs(30)),
            Duration::from_millis(100),
        )
        .await;
        let abort = h.abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            abort.cancel();
        });

        let report = h.send_loop.run().await;
        assert_eq!(report.attempts, 1);
        assert!(report.aborted);
        assert_eq!(report.failed, 0);
        assert_eq!(h.reporter.sequences(), vec![1]);
        assert_eq!(h.reporter.outcomes(), vec![SendOutcome::Aborted]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_payload_carries_sequence_and_origin() {
        let mut h = harness(StubConnector::new(), Duration::from_millis(100)).await;
        h.send_loop.step().await;
        h.send_loop.step().await;
        h.manual.request();
        h.send_loop.step().await;
        h.send_loop.step().await;
        assert_eq!(h.stub.stats().sequences(), vec![1, 2]);
        assert_eq!(h.send_loop.report().attempts, 2);
    }
}
