//! Core data model: settings, inputs, artifacts and batch outcomes.
//!
//! - [`CompressionSettings`] / [`SettingsStore`]: the three tunables and
//!   their atomic snapshot holder
//! - [`SourceImage`]: an immutable raw input
//! - [`ConvertedArtifact`] / [`ArtifactRecord`]: a completed conversion and
//!   its persisted, metadata-only form
//! - [`BatchOutcome`]: what one pipeline run produced

mod settings;
mod types;

pub use settings::{
    CompressionSettings, SettingsStore, MAX_DIMENSION_MAX, MAX_DIMENSION_MIN,
    MAX_OUTPUT_BYTES_MAX, MAX_OUTPUT_BYTES_MIN, QUALITY_MAX, QUALITY_MIN,
};
pub use types::{
    derive_artifact_id, ArtifactRecord, BatchOutcome, ConvertedArtifact, PendingArtifact,
    SkippedImage, SourceImage,
};
