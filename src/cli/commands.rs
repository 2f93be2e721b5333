//! CLI argument definitions using clap.
//!
//! iotpulse takes a single connection string argument plus options that
//! override the config file:
//! - transport: which message transport to use
//! - delay: time between automatic sends
//! - origin: host identifier stamped on messages

use clap::Parser;
use iotpulse::config::Config;
use iotpulse::transport::TransportKind;
use std::path::PathBuf;

/// iotpulse - send device telemetry on a timer or on demand
#[derive(Parser, Debug)]
#[command(name = "iotpulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Device connection string as presented in the IoT hub portal
    #[arg(value_name = "CONNECTION_STRING")]
    pub connection_string: Option<String>,

    /// Transport used to deliver messages
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Milliseconds between automatic sends
    #[arg(short, long = "delay-ms", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Origin host identifier stamped on every message
    #[arg(long)]
    pub origin: Option<String>,

    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Command-line values win over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(kind) = self.transport {
            config.transport.kind = kind;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.session.delay_ms = delay_ms;
        }
        if let Some(origin) = &self.origin {
            config.session.origin = Some(origin.clone());
        }
    }
}
