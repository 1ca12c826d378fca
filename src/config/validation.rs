use crate::config::types::{ClientConfig, Config, RateConfig, RetryConfig, RunConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_client_config(&config.client)?;
    validate_rate_config(&config.rate)?;
    validate_retry_config(&config.retry)?;
    validate_run_config(&config.run)?;
    Ok(())
}

/// Validates HTTP client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "timeout_seconds must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.query_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "query_param cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates token bucket configuration
fn validate_rate_config(config: &RateConfig) -> Result<(), ConfigError> {
    if config.requests_per_minute < 1 {
        return Err(ConfigError::Validation(format!(
            "requests_per_minute must be >= 1, got {}",
            config.requests_per_minute
        )));
    }

    if config.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "burst must be >= 1, got {}",
            config.burst
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.checkpoint_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
