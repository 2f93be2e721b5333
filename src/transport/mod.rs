//! Message transport - the network side of a session.
//!
//! A `Connector` opens one `Connection` per session; the send loop owns that
//! connection and the session closes it exactly once. Which connector is
//! used is chosen by `TransportKind` and is invisible to the send loop.

mod dry_run;
mod http;
mod stub;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::TransportConfig;
use crate::connection::ConnectionDescriptor;
use crate::error::{Result, TransportError};
use crate::signal::CancellationSignal;

pub use dry_run::DryRunConnector;
pub use http::{HttpConnection, HttpConnector, events_url};
pub use stub::{StubConnector, StubStats};

/// Opens connections for a session.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection. Failure here is fatal to the session.
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>>;
}

/// An open connection, used by one send loop at a time.
#[async_trait]
pub trait Connection: Send {
    /// Send one payload.
    ///
    /// `abort` fires only when the session gives up waiting for an in-flight
    /// send during shutdown; implementations return
    /// `TransportError::Aborted` when that happens.
    async fn send(&mut self, payload: &[u8], abort: &CancellationSignal) -> std::result::Result<(), TransportError>;

    /// Release the connection.
    async fn close(&mut self) -> std::result::Result<(), TransportError>;
}

/// Connection handle shared between the session and its send loop.
///
/// The session keeps one clone so it can close the connection even when the
/// send loop task dies.
pub type SharedConnection = Arc<Mutex<Box<dyn Connection>>>;

/// Transport selector exposed on the command line and in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// HTTPS device-to-cloud events endpoint
    #[default]
    Http,
    /// Log payloads locally without any network traffic
    DryRun,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Http => f.write_str("http"),
            TransportKind::DryRun => f.write_str("dry-run"),
        }
    }
}

/// Build the connector for `kind`.
pub fn connector_for(kind: TransportKind, config: &TransportConfig) -> Box<dyn Connector> {
    match kind {
        TransportKind::Http => Box::new(HttpConnector::new(config.clone())),
        TransportKind::DryRun => Box::new(DryRunConnector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_default() {
        assert_eq!(TransportKind::default(), TransportKind::Http);
    }

    #[test]
    fn test_transport_kind_display() {
        assert_eq!(TransportKind::Http.to_string(), "http");
        assert_eq!(TransportKind::DryRun.to_string(), "dry-run");
    }

    #[test]
    fn test_transport_kind_serde() {
        let kind: TransportKind = serde_yaml::from_str("dry-run").unwrap();
        assert_eq!(kind, TransportKind::DryRun);
        assert_eq!(serde_json::to_string(&TransportKind::Http).unwrap(), "\"http\"");
    }

    #[test]
    fn test_transport_kind_value_enum() {
        let kind = TransportKind::from_str("dry-run", true).unwrap();
        assert_eq!(kind, TransportKind::DryRun);
    }

    #[tokio::test]
    async fn test_connector_for_dry_run() {
        let connector = connector_for(TransportKind::DryRun, &TransportConfig::default());
        let descriptor = ConnectionDescriptor::parse("HostName=h;DeviceId=d").unwrap();
        let mut conn = connector.open(&descriptor).await.unwrap();
        conn.send(b"{}", &CancellationSignal::new()).await.unwrap();
        conn.close().await.unwrap();
    }
}
