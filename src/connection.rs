//! Device connection string parsing.
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs as shown
//! in the IoT hub portal, e.g.
//! `HostName=hub.azure-devices.net;DeviceId=dev-1;SharedAccessKey=abc=`.
//! Only the structure is checked here; credentials are never validated.

use std::fmt;

use crate::error::{PulseError, Result};

const PARSE_PREFIX: &str = "Failed to parse provided connection string";

/// How the device authenticates, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    SharedAccessKey,
    SharedAccessSignature,
    X509Certificate,
    None,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::SharedAccessKey => "SharedAccessKey",
            AuthMethod::SharedAccessSignature => "SharedAccessSignature",
            AuthMethod::X509Certificate => "X509Certificate",
            AuthMethod::None => "None",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed device connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host_name: String,
    pub device_id: String,
    pub module_id: Option<String>,
    pub gateway_host_name: Option<String>,
    pub shared_access_key_name: Option<String>,
    pub shared_access_key: Option<String>,
    pub shared_access_signature: Option<String>,
    pub x509: bool,
}

impl ConnectionDescriptor {
    /// Parse a connection string.
    ///
    /// Keys are matched case-insensitively. `HostName` and `DeviceId` are
    /// required; unknown or repeated keys are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(parse_error("connection string is empty"));
        }

        let mut host_name = None;
        let mut device_id = None;
        let mut module_id = None;
        let mut gateway_host_name = None;
        let mut shared_access_key_name = None;
        let mut shared_access_key = None;
        let mut shared_access_signature = None;
        let mut x509 = None;

        for segment in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Values may contain '=' (base64 padding, SAS query strings)
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| parse_error(format!("segment '{}' is not Key=Value", segment)))?;
            let key = key.trim();
            let value = value.trim().to_string();
            if key.is_empty() {
                return Err(parse_error(format!("segment '{}' has an empty key", segment)));
            }

            let slot = match key.to_ascii_lowercase().as_str() {
                "hostname" => &mut host_name,
                "deviceid" => &mut device_id,
                "moduleid" => &mut module_id,
                "gatewayhostname" => &mut gateway_host_name,
                "sharedaccesskeyname" => &mut shared_access_key_name,
                "sharedaccesskey" => &mut shared_access_key,
                "sharedaccesssignature" => &mut shared_access_signature,
                "x509" => &mut x509,
                _ => return Err(parse_error(format!("unknown key '{}'", key))),
            };
            if slot.is_some() {
                return Err(parse_error(format!("duplicate key '{}'", key)));
            }
            *slot = Some(value);
        }

        let host_name = required(host_name, "HostName")?;
        let device_id = required(device_id, "DeviceId")?;
        let x509 = match x509.as_deref() {
            None => false,
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            Some(v) => return Err(parse_error(format!("x509 must be true or false, got '{}'", v))),
        };

        Ok(Self {
            host_name,
            device_id,
            module_id: module_id.filter(|v| !v.is_empty()),
            gateway_host_name: gateway_host_name.filter(|v| !v.is_empty()),
            shared_access_key_name: shared_access_key_name.filter(|v| !v.is_empty()),
            shared_access_key: shared_access_key.filter(|v| !v.is_empty()),
            shared_access_signature: shared_access_signature.filter(|v| !v.is_empty()),
            x509,
        })
    }

    /// Authentication method implied by the fields present.
    pub fn auth_method(&self) -> AuthMethod {
        if self.shared_access_key.is_some() {
            AuthMethod::SharedAccessKey
        } else if self.shared_access_signature.is_some() {
            AuthMethod::SharedAccessSignature
        } else if self.x509 {
            AuthMethod::X509Certificate
        } else {
            AuthMethod::None
        }
    }

    /// Host the transport talks to: the gateway when one is configured.
    pub fn endpoint_host(&self) -> &str {
        self.gateway_host_name.as_deref().unwrap_or(&self.host_name)
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostName={};DeviceId={}", self.host_name, self.device_id)?;
        if let Some(module) = &self.module_id {
            write!(f, ";ModuleId={}", module)?;
        }
        if let Some(gateway) = &self.gateway_host_name {
            write!(f, ";GatewayHostName={}", gateway)?;
        }
        if let Some(name) = &self.shared_access_key_name {
            write!(f, ";SharedAccessKeyName={}", name)?;
        }
        if self.shared_access_key.is_some() {
            f.write_str(";SharedAccessKey=***")?;
        }
        if self.shared_access_signature.is_some() {
            f.write_str(";SharedAccessSignature=***")?;
        }
        if self.x509 {
            f.write_str(";x509=true")?;
        }
        Ok(())
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(parse_error(format!("{} is required", key))),
    }
}

fn parse_error(detail: impl fmt::Display) -> PulseError {
    PulseError::Configuration(format!("{}: {}", PARSE_PREFIX, detail))
}
