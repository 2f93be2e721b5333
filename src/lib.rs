//! iotpulse - an interactive device agent for IoT hub telemetry
//!
//! A session sends one message straight away, then another every time the
//! delay elapses or the operator presses the send key, until the operator
//! stops it. Send failures are reported and the session carries on.

pub mod config;
pub mod connection;
pub mod error;
pub mod input;
pub mod message;
pub mod report;
pub mod sender;
pub mod session;
pub mod signal;
pub mod transport;
pub mod trigger;

pub use error::{PulseError, Result, TransportError};
