//! stationq CLI library
//!
//! Argument parsing, configuration loading and command handlers for the
//! `stationq` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands};
pub use config::AppConfig;
pub use error::{CliError, Result};
