//! Session module - runs the input monitor and send loop side by side.
//!
//! A session owns the cancellation signal, opens the transport connection,
//! supervises both tasks until they stop and closes the connection.

mod coordinator;

pub use coordinator::{RunResult, Session, SessionOptions};
