//! Error types for the console.

use crate::config::ConfigError;
use agentdesk_core::DeskError;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Desk(#[from] DeskError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
