//! Configuration module for Listing-Pacer
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_pacer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pacer.toml")).unwrap();
//! println!("Requests per minute: {}", config.rate.requests_per_minute);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ClientConfig, Config, OutputConfig, RateConfig, RetryConfig, RunConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
