//! Re-encoding of a bounded raster into the target output codec.

use tracing::{debug, info};

use crate::processing::compressor::seek_budget;
use crate::processing::{BoundedImage, Codec};
use crate::utils::{ConverterResult, OutputFormat};

/// Output of a budget-enforcing transcode.
pub struct TranscodedImage {
    pub bytes: Vec<u8>,
    /// Quality the final encoding settled on
    pub effective_quality: f32,
    /// False when the target codec could not fit the byte budget either
    pub budget_met: bool,
}

/// Pure, stateless, single-item transcoder.
///
/// Takes the compressor's bounded raster and serializes it in the target
/// codec at a single quality value; there is no second quality knob. Output
/// is deterministic for a fixed raster/quality/codec triple modulo encoder
/// nondeterminism, so callers must not depend on byte-exact results.
pub struct Transcoder<'a> {
    codec: &'a dyn Codec,
}

impl<'a> Transcoder<'a> {
    pub fn new(codec: &'a dyn Codec) -> Self {
        Self { codec }
    }

    /// Serializes `bounded` in `target` at `quality`.
    ///
    /// When source and target formats coincide the raster is still re-encoded
    /// rather than passed through, so the quality setting always applies.
    pub fn transcode(
        &self,
        bounded: &BoundedImage,
        target: OutputFormat,
        quality: f32,
    ) -> ConverterResult<Vec<u8>> {
        let output = self.codec.encode(&bounded.raster, target, quality)?;
        debug!(
            "Transcoded {:?} -> {:?}: {} -> {} bytes at quality {:.2}",
            bounded.format,
            target,
            bounded.encoded.len(),
            output.len(),
            quality
        );
        Ok(output)
    }

    /// Serializes `bounded` in `target` at `quality`, re-running the budget
    /// backoff against the final bytes.
    ///
    /// Codecs compress differently, so an intermediate encoding that fit the
    /// budget is no guarantee the target encoding does. The budget binds the
    /// bytes the caller actually receives.
    pub fn transcode_bounded(
        &self,
        bounded: &BoundedImage,
        target: OutputFormat,
        quality: f32,
        max_output_bytes: u64,
    ) -> ConverterResult<TranscodedImage> {
        let seek = seek_budget(
            self.codec,
            bounded.raster.clone(),
            target,
            quality,
            max_output_bytes,
        )?;
        debug!(
            "Transcoded {:?} -> {:?}: {} -> {} bytes at quality {:.2}",
            bounded.format,
            target,
            bounded.encoded.len(),
            seek.encoded.len(),
            seek.quality
        );
        if !seek.budget_met {
            info!(
                "Target encoding missed the byte budget after {} attempts ({} > {} bytes)",
                seek.attempts,
                seek.encoded.len(),
                max_output_bytes
            );
        }
        Ok(TranscodedImage {
            bytes: seek.encoded,
            effective_quality: seek.quality,
            budget_met: seek.budget_met,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompressionSettings, SourceImage};
    use crate::processing::codec::tests::{gradient, jpeg_bytes, noise};
    use crate::processing::{Compressor, NativeCodec};

    fn bounded_sample() -> BoundedImage {
        let codec = NativeCodec::new();
        let source = SourceImage::new(
            jpeg_bytes(&gradient(640, 480), 0.9),
            "sample.jpg",
            "image/jpeg",
        );
        Compressor::new(&codec)
            .compress(&source, &CompressionSettings::default())
            .unwrap()
    }

    #[test]
    fn webp_output_is_decodable() {
        let codec = NativeCodec::new();
        let bounded = bounded_sample();
        let output = Transcoder::new(&codec)
            .transcode(&bounded, OutputFormat::WebP, 0.8)
            .unwrap();

        let decoded = codec.decode(&output, "image/webp").unwrap();
        assert_eq!(decoded.width(), bounded.raster.width());
        assert_eq!(decoded.height(), bounded.raster.height());
    }

    #[test]
    fn transcoding_preserves_bounded_dimensions() {
        let codec = NativeCodec::new();
        let bounded = bounded_sample();
        for target in [OutputFormat::JPEG, OutputFormat::PNG, OutputFormat::WebP] {
            let output = Transcoder::new(&codec)
                .transcode(&bounded, target, 0.8)
                .unwrap();
            let decoded = codec.decode(&output, target.mime_type()).unwrap();
            assert_eq!(decoded.width(), bounded.raster.width());
        }
    }

    #[test]
    fn transcode_bounded_enforces_the_final_budget() {
        let codec = NativeCodec::new();
        // A JPEG intermediate of noise fits a generous budget easily, but the
        // same raster as PNG is several times larger.
        let source = SourceImage::new(
            jpeg_bytes(&noise(1000, 1000), 0.9),
            "noisy.jpg",
            "image/jpeg",
        );
        let bounded = Compressor::new(&codec)
            .compress(&source, &CompressionSettings::new(10_485_760, 4000, 0.9))
            .unwrap();
        assert!(bounded.budget_met);

        let budget = 200_000;
        let out = Transcoder::new(&codec)
            .transcode_bounded(&bounded, OutputFormat::PNG, 0.9, budget)
            .unwrap();
        // Either the backoff fit the budget, or the miss is reported.
        assert!(out.bytes.len() as u64 <= budget || !out.budget_met);
        codec.decode(&out.bytes, "image/png").unwrap();
    }
}
