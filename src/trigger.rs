//! Trigger source - decides when the next message goes out.
//!
//! Two origins feed a single stream of fire events:
//! - a timer armed `delay` after a reference instant
//! - manual requests from the input monitor
//!
//! Manual requests travel over a capacity-1 channel. A request made while
//! one is already pending is coalesced into it, and a pending request
//! survives until the next `next_fire` call picks it up.

use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, sleep_until};

use crate::signal::CancellationSignal;

/// Result of waiting for the next trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fire {
    /// The delay elapsed
    Timer,
    /// A manual request was consumed
    Manual,
    /// The cancellation signal was observed first
    Cancelled,
}

/// Create a linked manual-trigger handle and trigger source.
pub fn channel(delay: Duration, signal: CancellationSignal) -> (ManualTrigger, TriggerSource) {
    let (tx, rx) = mpsc::channel(1);
    (
        ManualTrigger { tx },
        TriggerSource {
            delay,
            manual_rx: rx,
            signal,
        },
    )
}

/// Sending half for manual "send now" requests.
#[derive(Debug, Clone)]
pub struct ManualTrigger {
    tx: mpsc::Sender<()>,
}

impl ManualTrigger {
    /// Request a send. Never blocks.
    ///
    /// Returns `false` when the request was coalesced into one already
    /// pending, or when the trigger source is gone.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("Manual trigger already pending, coalescing");
                false
            }
            Err(TrySendError::Closed(())) => false,
        }
    }
}

/// Receiving half: races the timer against manual requests.
#[derive(Debug)]
pub struct TriggerSource {
    delay: Duration,
    manual_rx: mpsc::Receiver<()>,
    signal: CancellationSignal,
}

impl TriggerSource {
    /// Configured delay between timer fires.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for whichever happens first after `reference`: the delay
    /// elapsing, a manual request, or cancellation.
    ///
    /// Exactly one event results per call and at most one manual request
    /// is consumed. Cancellation wins when several are ready at once.
    pub async fn next_fire(&mut self, reference: Instant) -> Fire {
        if self.signal.is_cancelled() {
            return Fire::Cancelled;
        }

        let deadline = reference + self.delay;
        let fire = tokio::select! {
            biased;
            _ = self.signal.cancelled() => Fire::Cancelled,
            // A closed channel yields None, which disables this branch
            Some(()) = self.manual_rx.recv() => Fire::Manual,
            _ = sleep_until(deadline) => Fire::Timer,
        };
        debug!("Trigger resolved: {:?}", fire);
        fire
    }
}
