//! Core types for conversion inputs, artifacts and batch outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ledger::PreviewHandle;

/// One raw input image as supplied by the caller.
///
/// Read-only: the pipeline never mutates the source buffer, and the artifact
/// retains it so the caller can re-display or re-download the original.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Raw image bytes as uploaded
    pub bytes: Vec<u8>,
    /// Filename as declared by the caller
    pub declared_name: String,
    /// Declared mime type; checked against the allow-list before decoding
    pub mime_type: String,
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, declared_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            declared_name: declared_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Output of the pipeline for one image, before the ledger assigns it a
/// preview handle and records it.
#[derive(Debug, Clone)]
pub struct PendingArtifact {
    pub id: String,
    pub source: SourceImage,
    pub output_bytes: Arc<Vec<u8>>,
    pub output_name: String,
    /// False when the quality floor was hit without meeting the byte budget
    pub budget_met: bool,
    pub created_at: DateTime<Utc>,
}

/// One completed conversion.
///
/// Immutable after creation; destroyed only by explicit removal from the
/// ledger, which also releases the preview handle.
#[derive(Debug, Clone)]
pub struct ConvertedArtifact {
    /// Unique per conversion, derived from the source name and timestamp
    pub id: String,
    /// The original input, retained for re-display/re-download
    pub source: SourceImage,
    /// Encoded output in the target codec
    pub output_bytes: Arc<Vec<u8>>,
    /// Source name with the extension rewritten to the target codec's
    pub output_name: String,
    pub original_size_bytes: u64,
    pub output_size_bytes: u64,
    /// May be negative: tiny or already-optimal inputs can grow
    pub saved_bytes: i64,
    /// Savings as a percentage of the original size (negative when grown)
    pub compression_ratio: f64,
    /// Revocable reference to the output bytes for on-screen preview
    pub preview: PreviewHandle,
    pub created_at: DateTime<Utc>,
}

impl ConvertedArtifact {
    /// The persisted, metadata-only form of this artifact.
    pub fn record(&self) -> ArtifactRecord {
        ArtifactRecord {
            id: self.id.clone(),
            source_name: self.source.declared_name.clone(),
            output_name: self.output_name.clone(),
            original_size_bytes: self.original_size_bytes,
            output_size_bytes: self.output_size_bytes,
            saved_bytes: self.saved_bytes,
            compression_ratio: self.compression_ratio,
            created_at: self.created_at,
        }
    }
}

/// Durable record of one conversion: provenance and size delta only.
///
/// Byte buffers and preview handles are session-scoped and never serialized;
/// a reloaded history shows names, sizes and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub id: String,
    pub source_name: String,
    pub output_name: String,
    pub original_size_bytes: u64,
    pub output_size_bytes: u64,
    pub saved_bytes: i64,
    pub compression_ratio: f64,
    pub created_at: DateTime<Utc>,
}

/// An input that was skipped because its conversion failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedImage {
    pub name: String,
    pub reason: String,
}

/// Result of running one batch through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Successful artifacts, in submission order
    pub artifacts: Vec<Arc<ConvertedArtifact>>,
    /// Failed inputs with their error messages, in submission order
    pub skipped: Vec<SkippedImage>,
    /// How many artifacts missed the byte budget despite the quality floor
    pub budget_unmet: usize,
    /// True when the batch was refused because consent was not granted
    pub refused: bool,
}

impl BatchOutcome {
    /// The no-op outcome returned when the consent gate is closed.
    pub fn refused() -> Self {
        Self {
            refused: true,
            ..Self::default()
        }
    }
}

static ARTIFACT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Derives a unique artifact id from the source name and creation time.
///
/// Small images convert in well under a millisecond and duplicate uploads
/// are valid input, so a per-process sequence number disambiguates
/// conversions that share both name and timestamp.
pub fn derive_artifact_id(declared_name: &str, created_at: DateTime<Utc>) -> String {
    let seq = ARTIFACT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", declared_name, created_at.timestamp_millis(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_for_the_same_name_and_instant() {
        let at = Utc::now();
        let first = derive_artifact_id("dup.jpg", at);
        let second = derive_artifact_id("dup.jpg", at);
        assert_ne!(first, second);
    }
}
