//! HTTPS transport for the device-to-cloud events endpoint.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use super::{Connection, Connector};
use crate::config::TransportConfig;
use crate::connection::ConnectionDescriptor;
use crate::error::{PulseError, Result, TransportError};
use crate::signal::CancellationSignal;

const API_VERSION: &str = "2020-03-13";

/// Build the events URL for a device (or module) identity.
///
/// `base_url` overrides `https://{endpoint_host}`; a trailing slash is ignored.
pub fn events_url(descriptor: &ConnectionDescriptor, base_url: Option<&str>) -> String {
    let base = match base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => format!("https://{}", descriptor.endpoint_host()),
    };
    let identity = match &descriptor.module_id {
        Some(module) => format!("devices/{}/modules/{}", descriptor.device_id, module),
        None => format!("devices/{}", descriptor.device_id),
    };
    format!("{}/{}/messages/events?api-version={}", base, identity, API_VERSION)
}

pub struct HttpConnector {
    config: TransportConfig,
}

impl HttpConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .build()
            .map_err(|e| PulseError::Connect(format!("Failed to build HTTP client: {}", e)))?;

        let url = events_url(descriptor, self.config.base_url.as_deref());
        reqwest::Url::parse(&url).map_err(|e| PulseError::Connect(format!("Invalid events URL {}: {}", url, e)))?;

        info!("HTTP transport ready: {}", url);
        Ok(Box::new(HttpConnection {
            client,
            url,
            authorization: descriptor.shared_access_signature.clone(),
        }))
    }
}

pub struct HttpConnection {
    client: reqwest::Client,
    url: String,
    authorization: Option<String>,
}

impl HttpConnection {
    async fn post(&self, payload: &[u8]) -> std::result::Result<(), TransportError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec());
        if let Some(auth) = &self.authorization {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!("POST {} -> {}", self.url, status);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn send(&mut self, payload: &[u8], abort: &CancellationSignal) -> std::result::Result<(), TransportError> {
        tokio::select! {
            biased;
            _ = abort.cancelled() => Err(TransportError::Aborted),
            result = self.post(payload) => result,
        }
    }

    async fn close(&mut self) -> std::result::Result<(), TransportError> {
        // reqwest pools connections per client; dropping it releases them
        debug!("HTTP transport closed: {}", self.url);
        Ok(())
    }
}
