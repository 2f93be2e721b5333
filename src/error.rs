//! Error types for iotpulse
//!
//! Centralized error handling using thiserror. `PulseError` covers the
//! session-level failures; `TransportError` is the per-attempt failure that
//! the send loop reports and swallows.

use thiserror::Error;

/// Session-level errors. Any of these ends the session.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Malformed connection string or configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The transport could not be opened
    #[error("Connect error: {0}")]
    Connect(String),

    /// The terminal input source failed
    #[error("Input error: {0}")]
    Input(#[source] std::io::Error),

    /// A session task panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of a single send attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    /// The abort token fired while the send was in flight
    #[error("Send aborted")]
    Aborted,
}

impl TransportError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }
}

/// Result type alias for iotpulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let err = PulseError::Configuration("missing HostName".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing HostName");
    }

    #[test]
    fn test_connect_error() {
        let err = PulseError::Connect("bad url".to_string());
        assert_eq!(err.to_string(), "Connect error: bad url");
    }

    #[test]
    fn test_input_error_keeps_source() {
        let io_err = std::io::Error::other("tty gone");
        let err = PulseError::Input(io_err);
        assert_eq!(err.to_string(), "Input error: tty gone");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PulseError = io_err.into();
        assert!(matches!(err, PulseError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<u32>>("{not: a list}").unwrap_err();
        let err: PulseError = yaml_err.into();
        assert!(matches!(err, PulseError::Yaml(_)));
        assert!(err.to_string().starts_with("YAML error:"));
    }

    #[test]
    fn test_transport_status_error() {
        let err = TransportError::Status {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401: unauthorized");
        assert!(!err.is_aborted());
    }

    #[test]
    fn test_transport_aborted() {
        assert!(TransportError::Aborted.is_aborted());
        assert_eq!(TransportError::Aborted.to_string(), "Send aborted");
    }
}
