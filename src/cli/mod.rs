//! CLI module for iotpulse - command-line arguments.
//!
//! Provides the argument parser and the glue that turns arguments plus
//! config into session options.

pub mod commands;

pub use commands::Cli;
