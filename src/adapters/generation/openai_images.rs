//! OpenAI image generation adapter.
//!
//! Calls the `/images/generations` endpoint with `response_format =
//! b64_json`. Compatible with any OpenAI-compatible images API. Transient
//! failures (network errors, 429, 5xx) are retried with exponential backoff.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::error::GenerationError;
use crate::domain::models::{Challenge, EncodedImage, GenerationConfig};
use crate::domain::ports::ImageGenerator;

const GENERATED_MEDIA_TYPE: &str = "image/png";

/// OpenAI-compatible image generator.
pub struct OpenAiImageGenerator {
    config: GenerationConfig,
    client: reqwest::Client,
}

impl OpenAiImageGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn api_key(&self) -> Result<String, GenerationError> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerationError::MissingApiKey)
    }

    async fn request_image(
        &self,
        api_key: &str,
        body: &ImagesRequest<'_>,
    ) -> Result<EncodedImage, GenerationError> {
        let url = format!("{}/images/generations", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let data = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                GenerationError::MalformedResponse("response contained no b64_json image".to_string())
            })?;

        Ok(EncodedImage::new(GENERATED_MEDIA_TYPE, data))
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    #[instrument(skip(self, challenge, prompt), fields(challenge_id = %challenge.id, model = %self.config.model))]
    async fn generate(
        &self,
        challenge: &Challenge,
        prompt: &str,
    ) -> Result<EncodedImage, GenerationError> {
        let api_key = self.api_key()?;
        let body = ImagesRequest {
            model: &self.config.model,
            prompt,
            n: 1,
            size: &self.config.size,
            response_format: "b64_json",
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.config.initial_backoff_ms.max(1)))
            .with_max_interval(Duration::from_millis(self.config.max_backoff_ms.max(1)))
            .with_max_elapsed_time(None)
            .build();

        let attempts = AtomicU32::new(0);
        let max_retries = self.config.max_retries;
        let (this, attempts, api_key, body) = (self, &attempts, api_key.as_str(), &body);

        let image = backoff::future::retry(policy, || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            this.request_image(api_key, body).await.map_err(|err| {
                if err.is_transient() && attempt <= max_retries {
                    warn!(attempt, error = %err, "image generation failed, retrying");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        })
        .await?;

        debug!(
            attempts = attempts.load(Ordering::SeqCst),
            bytes = image.data.len(),
            "image generated"
        );
        Ok(image)
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}
