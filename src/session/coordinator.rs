//! Run coordinator.
//!
//! Lifecycle:
//! 1. open the connection (failure is fatal, nothing else starts)
//! 2. spawn the input monitor and the send loop
//! 3. wait for the monitor to stop
//! 4. give an in-flight send `shutdown_grace` to finish, then fire the
//!    abort token
//! 5. close the connection, even if the send loop died, and emit the
//!    summary
//!
//! Every run emits exactly one summary, and that summary carries any fatal
//! error. Callers should not print the error again.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};

use crate::config::SessionConfig;
use crate::connection::ConnectionDescriptor;
use crate::error::{PulseError, Result};
use crate::input::{DEFAULT_POLL_INTERVAL, InputMonitor, InputSource, MonitorExit};
use crate::report::{Reporter, RunSummary};
use crate::sender::{LoopReport, SendLoop};
use crate::signal::CancellationSignal;
use crate::transport::{Connector, SharedConnection};
use crate::trigger;

/// Timing and identity for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Delay between timer-triggered sends
    pub delay: Duration,
    /// Input poll period
    pub poll_interval: Duration,
    /// How long an in-flight send may run after cancellation
    pub shutdown_grace: Duration,
    /// Origin host identifier stamped on every message
    pub origin: String,
}

impl SessionOptions {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            delay: Duration::from_secs(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_grace: Duration::from_secs(5),
            origin: origin.into(),
        }
    }

    pub fn from_config(config: &SessionConfig, origin: impl Into<String>) -> Self {
        Self {
            delay: config.delay(),
            poll_interval: config.poll_interval(),
            shutdown_grace: config.shutdown_grace(),
            origin: origin.into(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// Outcome of a session that shut down cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub report: LoopReport,
    pub exit: MonitorExit,
}

impl RunResult {
    /// Process exit status for a clean shutdown.
    pub fn exit_code(&self) -> i32 {
        0
    }
}

pub struct Session {
    options: SessionOptions,
    signal: CancellationSignal,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self::with_signal(options, CancellationSignal::new())
    }

    /// Use an externally owned signal, e.g. one also wired to Ctrl+C.
    pub fn with_signal(options: SessionOptions, signal: CancellationSignal) -> Self {
        Self { options, signal }
    }

    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    /// Run the session to completion.
    ///
    /// Returns `Ok` when the session stopped through cancellation, whatever
    /// happened to individual sends. Connect failures, input failures and
    /// panicked tasks are returned as errors.
    pub async fn run(
        self,
        connector: &dyn Connector,
        descriptor: &ConnectionDescriptor,
        input: Box<dyn InputSource>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<RunResult> {
        let connection: SharedConnection = match connector.open(descriptor).await {
            Ok(connection) => Arc::new(Mutex::new(connection)),
            Err(e) => {
                error!("Failed to open connection: {}", e);
                reporter.summary(&RunSummary {
                    report: LoopReport::default(),
                    exit: None,
                    error: Some(e.to_string()),
                });
                return Err(e);
            }
        };
        info!(
            "Session started for device {} (delay {:?}, poll {:?})",
            descriptor.device_id, self.options.delay, self.options.poll_interval
        );

        let signal = self.signal.clone();
        let abort = CancellationSignal::new();
        let (manual, source) = trigger::channel(self.options.delay, signal.clone());

        let monitor = InputMonitor::new(input, manual, signal.clone(), self.options.poll_interval);
        let send_loop = SendLoop::new(
            Arc::clone(&connection),
            source,
            signal.clone(),
            abort.clone(),
            Arc::clone(&reporter),
            self.options.origin.clone(),
        );

        let mut monitor_handle = tokio::spawn(monitor.run());
        let mut loop_handle = tokio::spawn(send_loop.run());
        let mut finished_loop = None;

        let monitor_result = tokio::select! {
            res = &mut monitor_handle => join_monitor(res),
            res = &mut loop_handle => {
                // The loop stops first only on external cancellation or a panic
                signal.cancel();
                finished_loop = Some(res);
                join_monitor(monitor_handle.await)
            }
        };
        if let Err(e) = &monitor_result {
            error!("Input monitor failed: {}", e);
            // Stop the loop so the fault can be reported
            signal.cancel();
        }

        let loop_result = match finished_loop {
            Some(res) => res,
            None => self.wait_for_loop(loop_handle, &abort).await,
        };

        let (report, loop_error) = match loop_result {
            Ok(report) => (report, None),
            Err(e) => {
                error!("Send loop task failed: {}", e);
                (LoopReport::default(), Some(PulseError::Task(format!("send loop: {}", e))))
            }
        };
        close_connection(&connection).await;

        let outcome = match (monitor_result, loop_error) {
            (Err(e), _) => Err(e),
            (Ok(_), Some(e)) => Err(e),
            (Ok(exit), None) => Ok(RunResult {
                report: report.clone(),
                exit,
            }),
        };

        reporter.summary(&RunSummary {
            report,
            exit: outcome.as_ref().ok().map(|r| r.exit),
            error: outcome.as_ref().err().map(|e| e.to_string()),
        });
        info!("Session finished: {:?}", outcome.as_ref().map(|r| &r.report));
        outcome
    }

    async fn wait_for_loop(
        &self,
        mut handle: JoinHandle<LoopReport>,
        abort: &CancellationSignal,
    ) -> std::result::Result<LoopReport, JoinError> {
        match tokio::time::timeout(self.options.shutdown_grace, &mut handle).await {
            Ok(res) => res,
            Err(_) => {
                warn!(
                    "Send still in flight after {:?}, aborting it",
                    self.options.shutdown_grace
                );
                abort.cancel();
                handle.await
            }
        }
    }
}

fn join_monitor(res: std::result::Result<Result<MonitorExit>, JoinError>) -> Result<MonitorExit> {
    match res {
        Ok(result) => result,
        Err(e) => Err(PulseError::Task(format!("input monitor: {}", e))),
    }
}

async fn close_connection(connection: &SharedConnection) {
    // The loop has stopped by now, so the lock is free
    match connection.lock().await.close().await {
        Ok(()) => info!("Connection closed"),
        Err(e) => warn!("Failed to close connection: {}", e),
    }
}
