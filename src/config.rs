use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PulseError;
use crate::transport::TransportKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub session: SessionConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub delay_ms: u64,
    pub poll_interval_ms: u64,
    pub shutdown_grace_ms: u64,
    pub origin: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            poll_interval_ms: 200,
            shutdown_grace_ms: 5000,
            origin: None,
        }
    }
}

impl SessionConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Http,
            base_url: None,
            timeout_ms: 30000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            session: SessionConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read and validate one config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, PulseError> {
        let content = fs::read_to_string(&path)?;

        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> std::result::Result<(), PulseError> {
        if self.session.poll_interval_ms == 0 {
            return Err(PulseError::Configuration(
                "session.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.transport.timeout_ms == 0 {
            return Err(PulseError::Configuration(
                "transport.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.delay(), Duration::from_secs(1));
        assert_eq!(config.session.poll_interval(), Duration::from_millis(200));
        assert_eq!(config.session.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.transport.kind, TransportKind::Http);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("iotpulse.yml");
        fs::write(
            &path,
            r#"
log_level: debug
session:
  delay_ms: 250
  origin: bench-01
transport:
  kind: dry-run
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.session.delay_ms, 250);
        assert_eq!(config.session.poll_interval_ms, 200);
        assert_eq!(config.session.origin.as_deref(), Some("bench-01"));
        assert_eq!(config.transport.kind, TransportKind::DryRun);
        assert_eq!(config.transport.timeout_ms, 30000);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_load_rejects_zero_poll_interval() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "session:\n  poll_interval_ms: 0\n").unwrap();
        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, PulseError::Configuration(_)));
    }

    #[test]
    fn test_load_rejects_malformed_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "session: [not, a, map").unwrap();
        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, PulseError::Yaml(_)));
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load_from_file(temp.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, PulseError::Io(_)));
    }
}
