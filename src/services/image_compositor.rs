//! Side-by-side composite of a target and a candidate image.
//!
//! The target is drawn on the left, the candidate on the right, on a
//! white canvas sized `(w1 + w2, max(h1, h2))`. The result is re-encoded
//! as a single payload for one scoring call.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::error::CompositorError;
use crate::domain::models::{
    CompositeFormat, CompositorConfig, EncodedImage, FetchedImage, ImageRef,
};
use crate::domain::ports::ImageResolver;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CANDIDATE_LABEL: &str = "candidate";

pub struct ImageCompositor {
    resolver: Arc<dyn ImageResolver>,
    config: CompositorConfig,
}

impl ImageCompositor {
    pub fn new(resolver: Arc<dyn ImageResolver>, config: CompositorConfig) -> Self {
        Self { resolver, config }
    }

    /// Fetch the target, decode both images and build the composite.
    ///
    /// The fetched target buffer is dropped before this returns, on success
    /// and on failure.
    #[instrument(skip(self, target, candidate), fields(image = %target, format = ?self.config.format))]
    pub async fn compose(
        &self,
        target: &ImageRef,
        candidate: &EncodedImage,
    ) -> Result<EncodedImage, CompositorError> {
        let candidate_bytes = candidate
            .decode_bytes()
            .map_err(|e| CompositorError::image_load(CANDIDATE_LABEL, e))?;

        let fetched = self.resolver.fetch(target).await?;
        debug!(bytes = fetched.len(), "target fetched");

        let config = self.config.clone();
        tokio::task::spawn_blocking(move || compose_images(&fetched, &candidate_bytes, &config))
            .await
            .map_err(|e| CompositorError::Render(format!("compositing task failed: {e}")))?
    }
}

/// Decode, lay out and encode without any I/O.
pub fn compose_images(
    target: &FetchedImage,
    candidate: &[u8],
    config: &CompositorConfig,
) -> Result<EncodedImage, CompositorError> {
    let left = image::load_from_memory(target.bytes())
        .map_err(|e| CompositorError::image_load(target.label(), e))?;
    let right = image::load_from_memory(candidate)
        .map_err(|e| CompositorError::image_load(CANDIDATE_LABEL, e))?;

    let canvas = side_by_side(&left, &right, config.max_canvas_dimension)?;
    encode(canvas, config)
}

fn side_by_side(
    left: &DynamicImage,
    right: &DynamicImage,
    max_dimension: u32,
) -> Result<RgbaImage, CompositorError> {
    let (lw, lh) = (left.width(), left.height());
    let (rw, rh) = (right.width(), right.height());

    if lw == 0 || lh == 0 || rw == 0 || rh == 0 {
        return Err(CompositorError::Render(format!(
            "cannot composite empty image ({lw}x{lh} and {rw}x{rh})"
        )));
    }

    let width = lw
        .checked_add(rw)
        .ok_or_else(|| CompositorError::Render("composite width overflows".to_string()))?;
    let height = lh.max(rh);

    if width > max_dimension || height > max_dimension {
        return Err(CompositorError::Render(format!(
            "composite {width}x{height} exceeds the {max_dimension}px limit"
        )));
    }

    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
    imageops::overlay(&mut canvas, &left.to_rgba8(), 0, 0);
    imageops::overlay(&mut canvas, &right.to_rgba8(), i64::from(lw), 0);

    Ok(canvas)
}

fn encode(canvas: RgbaImage, config: &CompositorConfig) -> Result<EncodedImage, CompositorError> {
    let mut buffer = Vec::new();

    match config.format {
        CompositeFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, config.jpeg_quality.clamp(1, 100))
                .encode_image(&rgb)
                .map_err(|e| CompositorError::Render(format!("jpeg encoding failed: {e}")))?;
        }
        CompositeFormat::Png => {
            canvas
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| CompositorError::Render(format!("png encoding failed: {e}")))?;
        }
    }

    Ok(EncodedImage::from_bytes(config.format.media_type(), &buffer))
}
