//! Offline transport that only logs payloads.

use async_trait::async_trait;
use log::info;

use super::{Connection, Connector};
use crate::connection::ConnectionDescriptor;
use crate::error::{Result, TransportError};
use crate::signal::CancellationSignal;

#[derive(Debug, Default)]
pub struct DryRunConnector;

#[async_trait]
impl Connector for DryRunConnector {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        info!("Dry-run transport for device {}", descriptor.device_id);
        Ok(Box::new(DryRunConnection {
            device_id: descriptor.device_id.clone(),
        }))
    }
}

struct DryRunConnection {
    device_id: String,
}

#[async_trait]
impl Connection for DryRunConnection {
    async fn send(&mut self, payload: &[u8], _abort: &CancellationSignal) -> std::result::Result<(), TransportError> {
        info!("[dry-run] {} <- {}", self.device_id, String::from_utf8_lossy(payload));
        Ok(())
    }

    async fn close(&mut self) -> std::result::Result<(), TransportError> {
        Ok(())
    }
}
