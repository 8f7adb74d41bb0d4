//! Codec capability: decode, resize and encode rasters.
//!
//! The pipeline only ever touches imaging libraries through the [`Codec`]
//! trait, so tests can inject failures and embedders can swap encoders. The
//! production implementation binds to the `image` crate, plus the `webp`
//! crate for lossy WebP (the `image` crate's own WebP encoder is lossless
//! only and has no quality knob).

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

use crate::utils::{ConverterError, ConverterResult, OutputFormat};

/// Decode/resize/encode operations over raster images.
pub trait Codec: Send + Sync {
    /// Decodes `bytes` according to the declared mime type.
    ///
    /// The mime type is checked against the allow-list first; the bytes must
    /// then actually parse as that format.
    fn decode(&self, bytes: &[u8], mime_type: &str) -> ConverterResult<DynamicImage>;

    /// Bounds both dimensions to `max_dimension_px`, preserving aspect ratio
    /// so the larger dimension lands exactly on the limit. Never upscales.
    fn resize(&self, image: &DynamicImage, max_dimension_px: u32) -> DynamicImage;

    /// Serializes the raster in `format` at `quality` (in (0, 1]).
    fn encode(&self, image: &DynamicImage, format: OutputFormat, quality: f32) -> ConverterResult<Vec<u8>>;
}

/// Production codec over the `image` and `webp` crates.
#[derive(Debug, Clone, Default)]
pub struct NativeCodec;

impl NativeCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for NativeCodec {
    fn decode(&self, bytes: &[u8], mime_type: &str) -> ConverterResult<DynamicImage> {
        let format = OutputFormat::from_mime(mime_type)?;
        ImageReader::with_format(Cursor::new(bytes), format.image_format())
            .decode()
            .map_err(|e| ConverterError::decode(format!("Failed to decode '{}': {}", mime_type, e)))
    }

    fn resize(&self, image: &DynamicImage, max_dimension_px: u32) -> DynamicImage {
        if image.width() <= max_dimension_px && image.height() <= max_dimension_px {
            return image.clone();
        }
        image.resize(max_dimension_px, max_dimension_px, FilterType::Lanczos3)
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat, quality: f32) -> ConverterResult<Vec<u8>> {
        let quality_pct = quality_percent(quality);
        match format {
            OutputFormat::JPEG => {
                // JPEG carries no alpha channel.
                let rgb = image.to_rgb8();
                let mut buffer = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality_pct);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| ConverterError::encode(format!("JPEG encode failed: {}", e)))?;
                Ok(buffer)
            }
            OutputFormat::PNG => {
                let mut buffer = Vec::new();
                let encoder = PngEncoder::new_with_quality(
                    &mut buffer,
                    CompressionType::Best,
                    PngFilterType::Adaptive,
                );
                image
                    .write_with_encoder(encoder)
                    .map_err(|e| ConverterError::encode(format!("PNG encode failed: {}", e)))?;
                Ok(buffer)
            }
            OutputFormat::WebP => {
                let rgba = image.to_rgba8();
                let encoder = webp::Encoder::from_rgba(&rgba, image.width(), image.height());
                let encoded = encoder.encode(quality_pct as f32);
                Ok(encoded.to_vec())
            }
        }
    }
}

/// Maps the (0, 1] quality knob onto the 1-100 scale the encoders use.
fn quality_percent(quality: f32) -> u8 {
    (quality.clamp(0.01, 1.0) * 100.0).round() as u8
}
