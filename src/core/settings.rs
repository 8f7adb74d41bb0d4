//! Compression settings and the shared settings holder.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Recognized range for the quality knob.
pub const QUALITY_MIN: f32 = 0.10;
pub const QUALITY_MAX: f32 = 1.00;

/// Recognized range for the output byte budget (0.1 MB – 10 MB).
pub const MAX_OUTPUT_BYTES_MIN: u64 = 104_857;
pub const MAX_OUTPUT_BYTES_MAX: u64 = 10_485_760;

/// Recognized range for the dimension bound in pixels.
pub const MAX_DIMENSION_MIN: u32 = 500;
pub const MAX_DIMENSION_MAX: u32 = 4000;

/// The three tunable parameters of the pipeline.
///
/// Values are always within their recognized ranges: constructors and
/// [`SettingsStore::update`] clamp out-of-range input instead of accepting it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSettings {
    /// Byte budget for the compressed output (soft target, see compressor)
    pub max_output_bytes: u64,
    /// Upper bound for either raster dimension; larger images are downscaled
    pub max_dimension_px: u32,
    /// Encoder quality in (0, 1]
    pub quality: f32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_output_bytes: 1_048_576, // 1 MB
            max_dimension_px: 1920,
            quality: 0.8,
        }
    }
}

impl CompressionSettings {
    /// Builds a settings snapshot, clamping every field into its range.
    pub fn new(max_output_bytes: u64, max_dimension_px: u32, quality: f32) -> Self {
        Self {
            max_output_bytes,
            max_dimension_px,
            quality,
        }
        .clamped()
    }

    /// Convenience constructor taking the byte budget in megabytes, the unit
    /// the settings surface exposes.
    pub fn from_megabytes(max_output_mb: f64, max_dimension_px: u32, quality: f32) -> Self {
        let bytes = (max_output_mb * 1024.0 * 1024.0).round().max(0.0) as u64;
        Self::new(bytes, max_dimension_px, quality)
    }

    /// Returns a copy with every field clamped into its recognized range.
    pub fn clamped(mut self) -> Self {
        self.max_output_bytes = self
            .max_output_bytes
            .clamp(MAX_OUTPUT_BYTES_MIN, MAX_OUTPUT_BYTES_MAX);
        self.max_dimension_px = self
            .max_dimension_px
            .clamp(MAX_DIMENSION_MIN, MAX_DIMENSION_MAX);
        self.quality = if self.quality.is_finite() {
            self.quality.clamp(QUALITY_MIN, QUALITY_MAX)
        } else {
            QUALITY_MAX
        };
        self
    }
}

/// Thread-safe holder of the current settings.
///
/// `snapshot()` returns the settings by value; a conversion that took its
/// snapshot keeps using it even if the settings are edited mid-batch. Edits
/// apply only to images that have not started processing yet.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<CompressionSettings>>,
}

impl SettingsStore {
    pub fn new(settings: CompressionSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings.clamped())),
        }
    }

    /// Atomic copy of the current settings.
    pub fn snapshot(&self) -> CompressionSettings {
        *self.inner.read().expect("settings lock poisoned")
    }

    /// Replaces the settings, clamping out-of-range fields.
    pub fn update(&self, settings: CompressionSettings) {
        let clamped = settings.clamped();
        debug!(
            "Settings updated: {} bytes / {} px / quality {:.2}",
            clamped.max_output_bytes, clamped.max_dimension_px, clamped.quality
        );
        *self.inner.write().expect("settings lock poisoned") = clamped;
    }
}
