//! Error handling for the stationq CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Station queue error: {0}")]
    Stationq(#[from] stationq_core::StationqError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration loading error: {0}")]
    Figment(#[from] figment::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
