use serde::Deserialize;

/// Main configuration structure for Listing-Pacer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    pub rate: RateConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Search endpoint every item query is sent to
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-seconds", default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User-Agent header value
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header value
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    /// Name of the query-string parameter carrying the item query
    #[serde(rename = "query-param", default = "default_query_param")]
    pub query_param: String,

    /// Optional Netscape-format cookies.txt loaded at client construction
    #[serde(rename = "cookies-path", default)]
    pub cookies_path: Option<String>,
}

/// Token bucket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateConfig {
    /// Long-run request rate
    #[serde(rename = "requests-per-minute")]
    pub requests_per_minute: u32,

    /// Bucket capacity (requests allowed back to back)
    pub burst: u32,
}

/// Retry policy for soft blocks (captcha, access denied, rate limited)
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Fetches per item per run before the last soft-block outcome is recorded
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Checkpoint and resume configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Path to the SQLite checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Treat only successful rows as done when resuming
    #[serde(rename = "retry-failed", default)]
    pub retry_failed: bool,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory for the results CSV; defaults to the item file's directory
    #[serde(rename = "output-dir", default)]
    pub output_dir: Option<String>,
}

fn default_timeout_seconds() -> u64 {
    25
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/122.0 Safari/537.36"
        .to_string()
}

fn default_accept_language() -> String {
    "ru-RU,ru;q=0.9".to_string()
}

fn default_query_param() -> String {
    "q".to_string()
}

fn default_max_attempts() -> u32 {
    3
}
