//! Image references and encoded image payloads.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Location of a target image: a remote URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageRef {
    /// `http://` or `https://` location
    Url(String),
    /// Filesystem path (relative paths resolve against the working directory)
    Path(PathBuf),
}

impl ImageRef {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl FromStr for ImageRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("image reference cannot be empty".to_string());
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Url(trimmed.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }
}

impl TryFrom<String> for ImageRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Base64 image payload with its media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// MIME type, e.g. `image/jpeg`
    pub media_type: String,

    /// Standard base64 data, without a `data:` prefix
    pub data: String,
}

impl EncodedImage {
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw image bytes.
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Decode the payload back to raw bytes.
    ///
    /// Accepts a `data:<type>;base64,` prefix, which some generation
    /// services return.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let data = self
            .data
            .split_once(";base64,")
            .filter(|(prefix, _)| prefix.starts_with("data:"))
            .map_or(self.data.as_str(), |(_, rest)| rest);

        STANDARD.decode(data.trim())
    }
}

/// Image bytes fetched for a single compositing pass.
///
/// Held only for the duration of one `compose` call; the buffer is
/// released when this value is dropped, whether compositing succeeded or not.
pub struct FetchedImage {
    label: String,
    bytes: Vec<u8>,
}

impl FetchedImage {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for FetchedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedImage")
            .field("label", &self.label)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Drop for FetchedImage {
    fn drop(&mut self) {
        debug!(source = %self.label, bytes = self.bytes.len(), "released fetched image");
    }
}
