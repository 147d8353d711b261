use async_trait::async_trait;

use crate::domain::error::CompositorError;
use crate::domain::models::{FetchedImage, ImageRef};

/// Resolves an image reference to raw bytes
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Fetch the bytes behind `image`
    ///
    /// # Errors
    /// Returns `CompositorError::ImageLoad` if the image cannot be read
    async fn fetch(&self, image: &ImageRef) -> Result<FetchedImage, CompositorError>;
}
