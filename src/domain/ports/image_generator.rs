use async_trait::async_trait;

use crate::domain::error::GenerationError;
use crate::domain::models::{Challenge, EncodedImage};

/// Generative image model collaborator
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produce an image for `prompt`, attempted against `challenge`
    async fn generate(
        &self,
        challenge: &Challenge,
        prompt: &str,
    ) -> Result<EncodedImage, GenerationError>;
}
