use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded on every run in the checkpoint so a resumed run can be
/// told apart from one started under a different configuration.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID: &str = r#"
[client]
base-url = "https://www.avito.ru/"
timeout-seconds = 25
user-agent = "TestAgent/1.0"

[rate]
requests-per-minute = 12
burst = 3

[run]
checkpoint-path = "./checkpoint.db"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.client.base_url, "https://www.avito.ru/");
        assert_eq!(config.client.user_agent, "TestAgent/1.0");
        assert_eq!(config.rate.requests_per_minute, 12);
        assert_eq!(config.rate.burst, 3);
        assert_eq!(config.run.checkpoint_path, "./checkpoint.db");
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(VALID).unwrap();

        assert_eq!(config.client.accept_language, "ru-RU,ru;q=0.9");
        assert_eq!(config.client.query_param, "q");
        assert!(config.client.cookies_path.is_none());
        assert_eq!(config.retry.max_attempts, 3);
        assert!(!config.run.retry_failed);
        assert!(config.output.output_dir.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/pacer.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_burst_is_rejected() {
        let content = VALID.replace("burst = 3", "burst = 0");
        let result = parse_config(&content);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
