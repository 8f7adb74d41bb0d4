//! Orchestration entry points: what an embedding UI calls.
//!
//! [`ConverterApp`] owns the settings store, the conversion ledger and the
//! codec, and runs batches through the pipeline. Images are processed
//! strictly sequentially in submission order — a deliberate backpressure
//! choice that bounds peak memory for large batches — with each image's
//! decode/encode work on the blocking thread pool so the async runtime is
//! never blocked.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{
    derive_artifact_id, ArtifactRecord, BatchOutcome, CompressionSettings, ConvertedArtifact,
    PendingArtifact, SettingsStore, SkippedImage, SourceImage,
};
use crate::ledger::{ConversionLedger, LedgerStore};
use crate::processing::{Codec, Compressor, NativeCodec, Transcoder};
use crate::utils::{rewrite_extension, ConverterError, ConverterResult, OutputFormat};

/// Default target codec for converted artifacts.
pub const DEFAULT_TARGET_FORMAT: OutputFormat = OutputFormat::WebP;

/// The application core behind the UI: settings, ledger and pipeline.
pub struct ConverterApp {
    settings: SettingsStore,
    ledger: ConversionLedger,
    codec: Arc<dyn Codec>,
    target_format: OutputFormat,
}

impl ConverterApp {
    /// Opens the app over an injected persistence backend, restoring the
    /// persisted settings and ledger views. Uses the production codec and
    /// the default target format.
    pub fn open(store: Box<dyn LedgerStore>) -> ConverterResult<Self> {
        Self::with_codec(store, Arc::new(NativeCodec::new()), DEFAULT_TARGET_FORMAT)
    }

    /// Opens the app with an explicit codec and target format.
    pub fn with_codec(
        store: Box<dyn LedgerStore>,
        codec: Arc<dyn Codec>,
        target_format: OutputFormat,
    ) -> ConverterResult<Self> {
        let ledger = ConversionLedger::open(store)?;
        let settings = SettingsStore::new(ledger.settings());
        Ok(Self {
            settings,
            ledger,
            codec,
            target_format,
        })
    }

    /// Converts a batch of source images.
    ///
    /// Refuses to run (a logged no-op) until the caller has observed consent.
    /// Each image snapshots the settings as it starts, so mid-batch edits
    /// apply only to not-yet-started images. A failed image is skipped and
    /// reported in the outcome; it never aborts the rest of the batch.
    pub async fn convert(
        &mut self,
        sources: Vec<SourceImage>,
        consent_granted: bool,
    ) -> ConverterResult<BatchOutcome> {
        if !consent_granted {
            info!("Conversion refused: consent not granted");
            return Ok(BatchOutcome::refused());
        }

        let total = sources.len();
        info!("Converting batch of {} images", total);
        let mut outcome = BatchOutcome::default();

        for (index, source) in sources.into_iter().enumerate() {
            let name = source.declared_name.clone();
            let snapshot = self.settings.snapshot();
            let codec = Arc::clone(&self.codec);
            let target = self.target_format;

            // A panicking image task is a per-image failure like any decode
            // error; the rest of the batch still runs.
            let result = match tokio::task::spawn_blocking(move || {
                process_single(codec.as_ref(), source, &snapshot, target)
            })
            .await
            {
                Ok(result) => result,
                Err(e) => Err(ConverterError::encode(format!("Image task panicked: {e}"))),
            };

            match result {
                Ok(pending) => {
                    if !pending.budget_met {
                        outcome.budget_unmet += 1;
                    }
                    let artifact = self.ledger.record(pending)?;
                    debug!(
                        "[{}/{}] '{}' -> '{}' ({} -> {} bytes)",
                        index + 1,
                        total,
                        name,
                        artifact.output_name,
                        artifact.original_size_bytes,
                        artifact.output_size_bytes
                    );
                    outcome.artifacts.push(artifact);
                }
                Err(e) => {
                    warn!("[{}/{}] '{}' skipped: {}", index + 1, total, name, e);
                    outcome.skipped.push(SkippedImage {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if outcome.skipped.is_empty() {
            info!("Batch complete: {} artifacts", outcome.artifacts.len());
        } else {
            warn!(
                "Batch complete: {} artifacts, {} skipped",
                outcome.artifacts.len(),
                outcome.skipped.len()
            );
        }
        Ok(outcome)
    }

    /// Replaces the settings (clamped) and persists them with the ledger.
    pub fn update_settings(&mut self, settings: CompressionSettings) -> ConverterResult<()> {
        self.settings.update(settings);
        self.ledger.set_settings(self.settings.snapshot())
    }

    pub fn settings(&self) -> CompressionSettings {
        self.settings.snapshot()
    }

    pub fn target_format(&self) -> OutputFormat {
        self.target_format
    }

    // Ledger passthroughs for the UI surface.

    pub fn current_batch(&self) -> &[ArtifactRecord] {
        self.ledger.current_batch()
    }

    pub fn history(&self) -> &[ArtifactRecord] {
        self.ledger.history()
    }

    pub fn artifact(&self, id: &str) -> Option<Arc<ConvertedArtifact>> {
        self.ledger.artifact(id)
    }

    pub fn clear_batch(&mut self) -> ConverterResult<()> {
        self.ledger.clear_batch()
    }

    pub fn remove_from_history(&mut self, id: &str) -> ConverterResult<()> {
        self.ledger.remove_from_history(id)
    }

    pub fn clear_history(&mut self) -> ConverterResult<()> {
        self.ledger.clear_history()
    }

    /// Number of live preview handles; exposed for leak checks.
    pub fn active_previews(&self) -> usize {
        self.ledger.active_previews()
    }
}

/// Runs one image through compress + transcode synchronously.
///
/// Executed on the blocking thread pool; sequential dispatch from the
/// orchestrator keeps results in submission order.
fn process_single(
    codec: &dyn Codec,
    source: SourceImage,
    settings: &CompressionSettings,
    target: OutputFormat,
) -> ConverterResult<PendingArtifact> {
    let bounded = Compressor::new(codec).compress(&source, settings)?;
    // The transcoder starts from the compressor's effective quality and runs
    // its own backoff, so the budget binds the bytes in the target codec, not
    // the intermediate encoding.
    let output = Transcoder::new(codec).transcode_bounded(
        &bounded,
        target,
        bounded.effective_quality,
        settings.max_output_bytes,
    )?;

    let created_at = chrono::Utc::now();
    let output_name = rewrite_extension(&source.declared_name, target);
    Ok(PendingArtifact {
        id: derive_artifact_id(&source.declared_name, created_at),
        source,
        output_bytes: Arc::new(output.bytes),
        output_name,
        budget_met: output.budget_met,
        created_at,
    })
}
