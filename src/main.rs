use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::{error, info, warn};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use iotpulse::config::Config;
use iotpulse::connection::ConnectionDescriptor;
use iotpulse::input::{RawModeGuard, TerminalInput};
use iotpulse::report::ConsoleReporter;
use iotpulse::session::{RunResult, Session, SessionOptions};
use iotpulse::transport::connector_for;

mod cli;

use cli::Cli;

fn setup_logging(default_level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iotpulse")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("iotpulse.log");

    // The terminal is in raw mode while the session runs, so logs go to a file
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn prompt_connection_string() -> Result<String> {
    print!("Enter the device connection string: ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read connection string")?;

    let line = line.trim().to_string();
    if line.is_empty() {
        return Err(eyre!("No connection string provided"));
    }
    Ok(line)
}

/// `--origin` or config, then the `HOSTNAME`/`COMPUTERNAME` environment
/// variables when exported, then the device id.
fn resolve_origin(config: &Config, descriptor: &ConnectionDescriptor) -> String {
    let from_env = ["HOSTNAME", "COMPUTERNAME"].into_iter().map(|var| std::env::var(var).ok());
    pick_origin(
        std::iter::once(config.session.origin.clone()).chain(from_env),
        &descriptor.device_id,
    )
}

/// First non-blank candidate, or `fallback`.
fn pick_origin(candidates: impl IntoIterator<Item = Option<String>>, fallback: &str) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|candidate| candidate.trim().to_string())
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// The session already printed any fatal error in its summary line.
fn session_exit_code(outcome: &iotpulse::Result<RunResult>) -> u8 {
    match outcome {
        Ok(result) => result.exit_code() as u8,
        Err(_) => 1,
    }
}

fn print_banner(descriptor: &ConnectionDescriptor, config: &Config, origin: &str) {
    println!("{}", "iotpulse".bold().cyan());
    println!("  {:<24}{}", "Host name:", descriptor.endpoint_host());
    println!("  {:<24}{}", "Device ID:", descriptor.device_id);
    if let Some(module_id) = &descriptor.module_id {
        println!("  {:<24}{}", "Module ID:", module_id);
    }
    println!("  {:<24}{}", "Authentication method:", descriptor.auth_method());
    println!("  {:<24}{}", "Transport type:", config.transport.kind);
    println!("  {:<24}{}", "Origin:", origin);
    println!();
    println!("{}", "space/enter/s: send now   esc/q/ctrl-c: stop".dimmed());
}

async fn run_application(cli: &Cli, config: &Config) -> Result<ExitCode> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let raw = match &cli.connection_string {
        Some(s) => s.clone(),
        None => prompt_connection_string()?,
    };
    let descriptor = ConnectionDescriptor::parse(&raw)?;
    info!("Parsed connection string: {}", descriptor);

    let origin = resolve_origin(config, &descriptor);
    print_banner(&descriptor, config, &origin);

    let connector = connector_for(config.transport.kind, &config.transport);
    let session = Session::new(SessionOptions::from_config(&config.session, origin));

    // Raw mode swallows SIGINT, but a signal from elsewhere still stops us
    let signal = session.signal();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received");
                signal.cancel();
            }
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
    });

    let guard = RawModeGuard::enable().context("Failed to enable raw terminal mode")?;
    let result = session
        .run(
            connector.as_ref(),
            &descriptor,
            Box::new(TerminalInput::new()),
            Arc::new(ConsoleReporter::new()),
        )
        .await;
    drop(guard);

    if let Err(e) = &result {
        error!("Session failed: {}", e);
    }
    let code = session_exit_code(&result);
    info!("Exiting with status {}", code);
    Ok(ExitCode::from(code))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, then let the command line override it
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let level = if cli.is_verbose() {
        "debug".to_string()
    } else {
        config.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    setup_logging(&level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    let code = run_application(&cli, &config).await.context("Application failed")?;

    Ok(code)
}
