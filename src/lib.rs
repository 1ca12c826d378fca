//! Listing-Pacer: a polite, resumable per-item page fetcher
//!
//! This crate fetches one search page per input item at a strictly bounded rate,
//! classifies every HTTP outcome, backs off on soft blocks, and checkpoints
//! progress so an interrupted run resumes where it stopped.

pub mod config;
pub mod crawler;
pub mod input;
pub mod output;
pub mod pacing;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing-Pacer operations
#[derive(Debug, Error)]
pub enum PacerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Input error in {path}: {message}")]
    Input { path: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Listing-Pacer operations
pub type Result<T> = std::result::Result<T, PacerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use pacing::{CancellationSignal, TokenBucket};
pub use state::{Item, ItemResult, ItemState};
