//! Byte-budget-seeking compression of a single source image.

use image::DynamicImage;
use tracing::{debug, info};

use crate::core::{CompressionSettings, SourceImage};
use crate::processing::Codec;
use crate::utils::{ConverterResult, OutputFormat};

/// Cap on re-encode attempts so pathological inputs cannot loop unbounded.
const MAX_ATTEMPTS: usize = 8;
/// Quality is backed off first; it cannot drop below this floor.
const QUALITY_FLOOR: f32 = 0.10;
/// Quality backoff per attempt.
const QUALITY_STEP: f32 = 0.12;
/// Dimension backoff per attempt once quality is exhausted.
const DIMENSION_STEP: f32 = 0.85;

/// A source image bounded to the settings, still in its own encoding.
///
/// The raster is kept alongside the encoded bytes so the transcoder can
/// re-encode exactly what the budget loop settled on.
#[derive(Debug)]
pub struct BoundedImage {
    pub raster: DynamicImage,
    pub encoded: Vec<u8>,
    /// The source's own format (the intermediate encoding)
    pub format: OutputFormat,
    /// Quality the loop settled on; equals the settings quality unless the
    /// budget forced a backoff
    pub effective_quality: f32,
    /// False when the floor was hit without meeting the byte budget
    pub budget_met: bool,
}

/// Pure, stateless, single-item compressor.
pub struct Compressor<'a> {
    codec: &'a dyn Codec,
}

impl<'a> Compressor<'a> {
    pub fn new(codec: &'a dyn Codec) -> Self {
        Self { codec }
    }

    /// Decodes, bounds and recompresses one image.
    ///
    /// The dimension bound is hard; the byte budget is a target. Quality is
    /// reduced first (visual degradation there is usually less noticeable
    /// than resolution loss), then dimensions, for at most [`MAX_ATTEMPTS`]
    /// re-encodes. If the floor is hit without meeting the budget, the best
    /// attempt is returned with `budget_met = false`.
    pub fn compress(
        &self,
        source: &SourceImage,
        settings: &CompressionSettings,
    ) -> ConverterResult<BoundedImage> {
        let format = OutputFormat::from_mime(&source.mime_type)?;
        let decoded = self.codec.decode(&source.bytes, &source.mime_type)?;
        let mut raster = self.codec.resize(&decoded, settings.max_dimension_px);
        debug!(
            "'{}': {}x{} -> {}x{}",
            source.declared_name,
            decoded.width(),
            decoded.height(),
            raster.width(),
            raster.height()
        );

        let seek = seek_budget(
            self.codec,
            raster,
            format,
            settings.quality,
            settings.max_output_bytes,
        )?;
        if !seek.budget_met {
            info!(
                "'{}': byte budget unmet after {} attempts ({} > {} bytes), returning best attempt",
                source.declared_name,
                seek.attempts,
                seek.encoded.len(),
                settings.max_output_bytes
            );
        }

        Ok(BoundedImage {
            raster: seek.raster,
            encoded: seek.encoded,
            format,
            effective_quality: seek.quality,
            budget_met: seek.budget_met,
        })
    }
}

/// Outcome of one budget-seeking encode loop.
pub(crate) struct BudgetSeek {
    pub encoded: Vec<u8>,
    pub raster: DynamicImage,
    pub quality: f32,
    pub budget_met: bool,
    pub attempts: usize,
}

/// Encodes `raster` in `format` at `quality`, then backs off quality first
/// and dimensions second until the byte budget is met or the attempt cap is
/// hit. Shared by the compressor (intermediate encoding) and the transcoder
/// (final encoding), so the budget binds whatever codec the bytes leave in.
pub(crate) fn seek_budget(
    codec: &dyn Codec,
    mut raster: DynamicImage,
    format: OutputFormat,
    mut quality: f32,
    budget: u64,
) -> ConverterResult<BudgetSeek> {
    let mut encoded = codec.encode(&raster, format, quality)?;

    // Smallest attempt seen so far, starting with the initial encoding.
    let mut best = (encoded.clone(), raster.clone(), quality);

    let mut attempts = 0;
    while encoded.len() as u64 > budget && attempts < MAX_ATTEMPTS {
        attempts += 1;

        if format.supports_quality() && quality - QUALITY_STEP >= QUALITY_FLOOR {
            quality -= QUALITY_STEP;
        } else {
            // Quality exhausted (or the format has no quality knob):
            // shrink dimensions, but never below 1px.
            let width = ((raster.width() as f32 * DIMENSION_STEP) as u32).max(1);
            let height = ((raster.height() as f32 * DIMENSION_STEP) as u32).max(1);
            raster = raster.resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        }

        encoded = codec.encode(&raster, format, quality)?;
        if encoded.len() < best.0.len() {
            best = (encoded.clone(), raster.clone(), quality);
        }
    }

    // Prefer the final encoding when it met the budget; otherwise fall back
    // to the smallest attempt seen.
    let (encoded, raster, quality) = if encoded.len() as u64 <= budget {
        (encoded, raster, quality)
    } else {
        best
    };

    let budget_met = encoded.len() as u64 <= budget;
    Ok(BudgetSeek {
        encoded,
        raster,
        quality,
        budget_met,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::codec::tests::{gradient, jpeg_bytes, noise, png_bytes};
    use crate::processing::NativeCodec;

    fn source_from(image: &image::DynamicImage, name: &str, mime: &str) -> SourceImage {
        let bytes = if mime == "image/png" {
            png_bytes(image)
        } else {
            jpeg_bytes(image, 0.95)
        };
        SourceImage::new(bytes, name, mime)
    }

    #[test]
    fn output_dimensions_never_exceed_the_bound() {
        let codec = NativeCodec::new();
        let compressor = Compressor::new(&codec);
        let settings = CompressionSettings::new(10_485_760, 500, 0.8);
        let source = source_from(&gradient(1600, 900), "wide.jpg", "image/jpeg");

        let bounded = compressor.compress(&source, &settings).unwrap();
        assert!(bounded.raster.width() <= 500);
        assert!(bounded.raster.height() <= 500);
        assert_eq!(bounded.raster.width(), 500);
    }

    #[test]
    fn generous_budget_is_met_without_backoff() {
        let codec = NativeCodec::new();
        let compressor = Compressor::new(&codec);
        let settings = CompressionSettings::new(10_485_760, 4000, 0.8);
        let source = source_from(&gradient(400, 300), "easy.jpg", "image/jpeg");

        let bounded = compressor.compress(&source, &settings).unwrap();
        assert!(bounded.budget_met);
        assert!((bounded.effective_quality - 0.8).abs() < f32::EPSILON);
        assert!(bounded.encoded.len() as u64 <= settings.max_output_bytes);
    }

    #[test]
    fn tight_budget_backs_off_quality_first() {
        let codec = NativeCodec::new();
        let compressor = Compressor::new(&codec);
        // The clamp floor for the budget is the tightest the settings allow;
        // noise at this size is guaranteed to blow it on the first encode.
        let settings = CompressionSettings::new(0, 4000, 1.0);
        let source = source_from(&noise(1200, 900), "big.jpg", "image/jpeg");

        let bounded = compressor.compress(&source, &settings).unwrap();
        if bounded.budget_met {
            assert!(bounded.encoded.len() as u64 <= settings.max_output_bytes);
        }
        // The loop ran at least once and reduced quality before resolution.
        assert!(bounded.effective_quality < 1.0);
    }

    #[test]
    fn png_budget_seeking_shrinks_dimensions() {
        let codec = NativeCodec::new();
        let compressor = Compressor::new(&codec);
        let settings = CompressionSettings::new(0, 4000, 1.0);
        let source = source_from(&noise(1000, 1000), "noise.png", "image/png");

        let bounded = compressor.compress(&source, &settings).unwrap();
        // PNG has no quality knob, so the only lever is resolution.
        assert!(bounded.raster.width() < 1000);
        assert!((bounded.effective_quality - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pathological_budget_terminates_and_returns_a_result() {
        let codec = NativeCodec::new();
        let compressor = Compressor::new(&codec);
        let settings = CompressionSettings::new(0, 4000, 0.2);
        let source = source_from(&noise(1600, 1600), "huge.jpg", "image/jpeg");

        // Whether or not the clamped budget was met, the capped loop finished
        // and produced a decodable best attempt rather than an error.
        let bounded = compressor.compress(&source, &settings).unwrap();
        assert!(!bounded.encoded.is_empty());
        let redecoded = codec.decode(&bounded.encoded, "image/jpeg").unwrap();
        assert_eq!(redecoded.width(), bounded.raster.width());
    }

    #[test]
    fn unsupported_mime_is_a_decode_error() {
        let codec = NativeCodec::new();
        let compressor = Compressor::new(&codec);
        let settings = CompressionSettings::default();
        let source = SourceImage::new(vec![1, 2, 3], "movie.gif", "image/gif");

        let err = compressor.compress(&source, &settings).unwrap_err();
        assert!(matches!(err, crate::utils::ConverterError::Decode(_)));
    }
}
