use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use crate::utils::ConverterError;

/// Image formats the pipeline can decode and encode.
///
/// This doubles as the intermediate encoding (the source's own format) and
/// the target codec for transcoding. Anything outside this set is rejected
/// upstream of decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    JPEG,
    PNG,
    WebP,
}

impl OutputFormat {
    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::JPEG => &["jpg", "jpeg"],
            Self::PNG => &["png"],
            Self::WebP => &["webp"],
        }
    }

    /// Get the primary extension for this format
    pub fn primary_extension(&self) -> &str {
        self.extensions()[0]
    }

    /// The canonical mime type for this format
    pub fn mime_type(&self) -> &str {
        match self {
            Self::JPEG => "image/jpeg",
            Self::PNG => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Whether the encoder for this format has a lossy quality knob.
    ///
    /// PNG compression is lossless; quality backoff cannot shrink it, so the
    /// byte-budget loop goes straight to dimension reduction for PNG.
    pub fn supports_quality(&self) -> bool {
        !matches!(self, Self::PNG)
    }

    /// The `image` crate format identifier for decode/encode calls.
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::JPEG => image::ImageFormat::Jpeg,
            Self::PNG => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
        }
    }

    /// Resolves a declared mime type against the allow-list.
    ///
    /// Anything outside {png, jpeg, webp} fails with a `Decode` error before
    /// any byte inspection happens, per the upstream input contract.
    pub fn from_mime(mime: &str) -> Result<Self, ConverterError> {
        match mime.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(Self::JPEG),
            "image/png" => Ok(Self::PNG),
            "image/webp" => Ok(Self::WebP),
            other => Err(ConverterError::decode(format!(
                "Unsupported mime type: {}", other
            ))),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConverterError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        let ext = ext.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(Self::JPEG),
            "png" => Ok(Self::PNG),
            "webp" => Ok(Self::WebP),
            _ => Err(ConverterError::format(format!(
                "Unsupported image format: {}", ext
            ))),
        }
    }
}

/// Derives the output filename by swapping the extension for the target
/// format's primary extension. Names without an extension get one appended.
pub fn rewrite_extension(name: &str, format: OutputFormat) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    format!("{}.{}", stem, format.primary_extension())
}
