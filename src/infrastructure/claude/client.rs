//! Claude HTTP API client.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Client as ReqwestClient};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use super::errors::ClaudeApiError;
use super::types::{MessageRequest, MessageResponse};
use crate::domain::models::ScoringConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Claude HTTP client
#[derive(Clone)]
pub struct ClaudeClientConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Base URL, without the `/v1/messages` suffix
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Requests per second; 0 disables rate limiting
    pub requests_per_second: f64,
}

impl ClaudeClientConfig {
    /// Build from scoring settings, falling back to `ANTHROPIC_API_KEY`.
    pub fn from_scoring(config: &ScoringConfig) -> Result<Self, ClaudeApiError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or(ClaudeApiError::MissingApiKey)?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
            requests_per_second: config.requests_per_second,
        })
    }
}

impl fmt::Debug for ClaudeClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeClientConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

/// Mask all but the last four characters of a secret
pub fn redact(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{visible}")
    }
}

/// HTTP client for the Messages API
///
/// Features:
/// - Connection pooling and reuse (via `reqwest::Client`)
/// - Direct rate limiting (governor)
/// - Error classification (transient vs permanent)
///
/// Requests are never retried here.
pub struct ClaudeClient {
    http_client: ReqwestClient,
    base_url: String,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl ClaudeClient {
    pub fn new(config: ClaudeClientConfig) -> Result<Self, ClaudeApiError> {
        let mut headers = header::HeaderMap::new();
        let mut key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|_| ClaudeApiError::InvalidRequest("API key is not a valid header value".to_string()))?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let http_client = ReqwestClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()?;

        debug!(
            base_url = %config.base_url,
            api_key = %redact(&config.api_key),
            "claude client created"
        );

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: build_rate_limiter(config.requests_per_second),
        })
    }

    /// Send one Messages API request
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn send_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ClaudeApiError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "claude request rejected");
            return Err(ClaudeApiError::from_status(status, body));
        }

        serde_json::from_str(&body).map_err(|e| ClaudeApiError::InvalidResponse(e.to_string()))
    }
}

fn build_rate_limiter(requests_per_second: f64) -> Option<DefaultDirectRateLimiter> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return None;
    }

    let period = Duration::try_from_secs_f64(1.0 / requests_per_second).ok()?;
    Quota::with_period(period).map(RateLimiter::direct)
}
