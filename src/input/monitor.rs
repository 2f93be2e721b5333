//! Input monitor - polls the key source on its own task.
//!
//! Each wake drains every available key before sleeping again, so bursts of
//! presses between polls are never dropped. Trigger keys become manual
//! trigger requests; a cancel key sets the cancellation signal and ends the
//! monitor.

use std::time::Duration;

use log::{debug, info};

use super::keys::KeyAction;
use super::source::InputSource;
use crate::error::{PulseError, Result};
use crate::signal::CancellationSignal;
use crate::trigger::ManualTrigger;

/// Default time between input polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Why the monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// A cancel key was read and the signal was set by the monitor
    CancelKey,
    /// The signal was set elsewhere (OS signal, embedding code)
    SignalObserved,
}

pub struct InputMonitor {
    source: Box<dyn InputSource>,
    trigger: ManualTrigger,
    signal: CancellationSignal,
    poll_interval: Duration,
}

impl InputMonitor {
    pub fn new(
        source: Box<dyn InputSource>,
        trigger: ManualTrigger,
        signal: CancellationSignal,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            trigger,
            signal,
            poll_interval,
        }
    }

    /// Poll until a cancel key is read or the signal is set elsewhere.
    ///
    /// Input source failures are returned as `PulseError::Input`.
    pub async fn run(mut self) -> Result<MonitorExit> {
        info!("Input monitor started (poll interval {:?})", self.poll_interval);

        loop {
            if self.signal.is_cancelled() {
                info!("Input monitor observed cancellation");
                return Ok(MonitorExit::SignalObserved);
            }

            if self.drain()? {
                info!("Cancel key pressed, input monitor stopping");
                return Ok(MonitorExit::CancelKey);
            }

            tokio::select! {
                _ = self.signal.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Read every key available right now. Returns true on a cancel key.
    fn drain(&mut self) -> Result<bool> {
        while self.source.key_available().map_err(PulseError::Input)? {
            let Some(key) = self.source.read_key().map_err(PulseError::Input)? else {
                continue;
            };

            match key.action() {
                KeyAction::Cancel => {
                    self.signal.cancel();
                    return Ok(true);
                }
                KeyAction::Trigger => {
                    let queued = self.trigger.request();
                    debug!("Manual trigger from {:?} (queued: {})", key.code, queued);
                }
                KeyAction::Ignore => {}
            }
        }
        Ok(false)
    }
}
