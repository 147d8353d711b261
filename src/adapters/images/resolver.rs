//! Resolves target images from URLs or the local filesystem.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::domain::error::CompositorError;
use crate::domain::models::{FetchedImage, ImageRef};
use crate::domain::ports::ImageResolver;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Fetches `http(s)://` references with reqwest and paths with `tokio::fs`.
pub struct DefaultImageResolver {
    client: reqwest::Client,
}

impl DefaultImageResolver {
    pub fn new() -> Result<Self, CompositorError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, CompositorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompositorError::Render(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, CompositorError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CompositorError::image_load(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompositorError::image_load(url, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CompositorError::image_load(url, e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageResolver for DefaultImageResolver {
    async fn fetch(&self, image: &ImageRef) -> Result<FetchedImage, CompositorError> {
        let label = image.to_string();
        let bytes = match image {
            ImageRef::Url(url) => self.fetch_url(url).await?,
            ImageRef::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| CompositorError::image_load(&label, e))?,
        };

        if bytes.is_empty() {
            return Err(CompositorError::image_load(label, "image is empty"));
        }

        debug!(source = %label, bytes = bytes.len(), "image fetched");
        Ok(FetchedImage::new(label, bytes))
    }
}
