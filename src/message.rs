//! Telemetry message and its wire payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// One telemetry message, built fresh for each send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub origin: String,
}

impl Message {
    /// Build a message stamped with the current time.
    pub fn new(sequence: u64, origin: impl Into<String>) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            origin: origin.into(),
        }
    }

    /// Encode as the JSON body handed to the transport.
    pub fn to_payload(&self) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(self).map_err(|e| TransportError::Encode(e.to_string()))
    }
}

/// Hands out sequence numbers 1, 2, 3, ... one per send attempt.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    last: u64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next sequence number.
    pub fn advance(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}
