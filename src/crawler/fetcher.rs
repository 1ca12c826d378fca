//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests, including:
//! - Building the HTTP client with the configured headers, timeout, and cookies
//! - Taking a rate limiter permit before every request
//! - Turning transport failures into recorded outcomes instead of errors
//!
//! The fetcher never retries on its own; the run orchestrator decides.

use crate::config::{ClientConfig, Config};
use crate::crawler::cookies::load_cookie_jar;
use crate::pacing::{AcquireOutcome, CancellationSignal, TokenBucket};
use crate::{ConfigError, PacerError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Maximum number of redirects followed for one request
const MAX_REDIRECTS: usize = 10;

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Decoded response body
    pub body: String,

    /// Response headers
    pub headers: HeaderMap,
}

/// Result of one fetch attempt
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The server answered (any status)
    Response(FetchedPage),

    /// Connection, timeout, or body read failure, with its full cause chain
    NetworkError(String),

    /// Cancellation was observed before the request was sent
    Cancelled,
}

/// Something that can fetch one page for the run orchestrator
pub trait PageFetcher {
    /// Fetches `url` with `params` appended as query parameters
    fn fetch(
        &self,
        url: &Url,
        params: &[(&str, &str)],
        cancel: &CancellationSignal,
    ) -> impl Future<Output = FetchOutcome> + Send;
}

/// Rate-limited reqwest fetcher
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    limiter: TokenBucket,
}

impl HttpFetcher {
    pub fn new(client: Client, limiter: TokenBucket) -> Self {
        Self { client, limiter }
    }

    /// Builds the client and token bucket described by `config`
    pub fn from_config(config: &Config) -> Result<Self, PacerError> {
        let client = build_http_client(&config.client)?;
        let limiter = TokenBucket::from_config(&config.rate)?;
        Ok(Self::new(client, limiter))
    }

    pub fn limiter(&self) -> &TokenBucket {
        &self.limiter
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        params: &[(&str, &str)],
        cancel: &CancellationSignal,
    ) -> FetchOutcome {
        if self.limiter.acquire(cancel).await == AcquireOutcome::Cancelled {
            return FetchOutcome::Cancelled;
        }

        let response = match self.client.get(url.clone()).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = describe_error(&e);
                tracing::warn!("Network error on GET {}: {}", url, message);
                return FetchOutcome::NetworkError(message);
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        match response.text().await {
            Ok(body) => FetchOutcome::Response(FetchedPage {
                status,
                body,
                headers,
            }),
            Err(e) => {
                let message = describe_error(&e);
                tracing::warn!("Failed to read body from {}: {}", url, message);
                FetchOutcome::NetworkError(message)
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Cookies from `config.cookies_path` are loaded once here; a missing or
/// unreadable cookie file only produces a warning.
pub fn build_http_client(config: &ClientConfig) -> Result<Client, PacerError> {
    let mut headers = HeaderMap::new();
    let accept_language = HeaderValue::from_str(&config.accept_language).map_err(|e| {
        ConfigError::Validation(format!(
            "accept_language '{}' is not a valid header value: {}",
            config.accept_language, e
        ))
    })?;
    headers.insert(ACCEPT_LANGUAGE, accept_language);

    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true);

    if let Some(path) = &config.cookies_path {
        if let Some(jar) = load_cookie_jar(Path::new(path)) {
            builder = builder.cookie_provider(jar);
        }
    }

    Ok(builder.build()?)
}

/// Formats an error with every source in its chain
fn describe_error(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
