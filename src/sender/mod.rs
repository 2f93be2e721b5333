//! Send loop module - the sequential send state machine.
//!
//! This module provides:
//! - SendLoop: sends one message at a time, waiting on the trigger source
//! - LoopState: Idle -> Sending -> AwaitingTrigger -> (Sending | Cancelled)
//! - LoopReport: per-session attempt counters

mod send_loop;

pub use send_loop::{LoopReport, LoopState, SendLoop};
