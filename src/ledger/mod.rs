//! The conversion ledger: the only stateful component of the pipeline.
//!
//! Two ordered views of completed conversions — `currentBatch` (cleared
//! wholesale) and `history` (append-only, individually removable) — backed by
//! an injected durable store. Every mutation is written through before the
//! call returns. Live artifacts (with bytes and preview handles) exist only
//! for conversions made this session; restored records carry provenance and
//! size deltas without bytes.

mod preview;
mod store;

pub use preview::{PreviewHandle, PreviewRegistry};
pub use store::{JsonFileStore, LedgerStore, MemoryStore, PersistedState, STORE_FILE_NAME};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{ArtifactRecord, CompressionSettings, ConvertedArtifact, PendingArtifact};
use crate::utils::ConverterResult;

/// Append-only, persisted record of every produced artifact.
pub struct ConversionLedger {
    current_batch: Vec<ArtifactRecord>,
    history: Vec<ArtifactRecord>,
    /// Artifacts produced this session, keyed by id. Entries restored from
    /// disk have no live counterpart.
    live: HashMap<String, Arc<ConvertedArtifact>>,
    previews: PreviewRegistry,
    settings: CompressionSettings,
    store: Box<dyn LedgerStore>,
}

impl ConversionLedger {
    /// Opens the ledger, loading any persisted document from `store`.
    pub fn open(store: Box<dyn LedgerStore>) -> ConverterResult<Self> {
        let persisted = store.load()?.unwrap_or_default();
        debug!(
            "Ledger opened: {} history entries, {} in current batch",
            persisted.history.len(),
            persisted.current_batch.len()
        );
        Ok(Self {
            current_batch: persisted.current_batch,
            history: persisted.history,
            live: HashMap::new(),
            previews: PreviewRegistry::new(),
            settings: persisted.settings.clamped(),
            store,
        })
    }

    /// Records one completed conversion in both views and persists.
    ///
    /// Registers the preview handle here so creation and release are paired
    /// in one place.
    pub fn record(&mut self, pending: PendingArtifact) -> ConverterResult<Arc<ConvertedArtifact>> {
        let original_size_bytes = pending.source.size_bytes();
        let output_size_bytes = pending.output_bytes.len() as u64;
        let saved_bytes = original_size_bytes as i64 - output_size_bytes as i64;
        let compression_ratio = if original_size_bytes > 0 {
            saved_bytes as f64 / original_size_bytes as f64 * 100.0
        } else {
            0.0
        };

        let preview = self.previews.register(Arc::clone(&pending.output_bytes));
        let artifact = Arc::new(ConvertedArtifact {
            id: pending.id,
            source: pending.source,
            output_bytes: pending.output_bytes,
            output_name: pending.output_name,
            original_size_bytes,
            output_size_bytes,
            saved_bytes,
            compression_ratio,
            preview,
            created_at: pending.created_at,
        });

        let record = artifact.record();
        self.current_batch.push(record.clone());
        self.history.push(record);
        // An id reuse would otherwise orphan the displaced artifact's handle.
        if let Some(displaced) = self.live.insert(artifact.id.clone(), Arc::clone(&artifact)) {
            self.previews.release(displaced.preview);
        }
        self.persist()?;

        debug!(
            "Recorded '{}': {} -> {} bytes ({:.1}% saved)",
            artifact.output_name,
            artifact.original_size_bytes,
            artifact.output_size_bytes,
            artifact.compression_ratio
        );
        Ok(artifact)
    }

    /// Empties the current batch view only. History keeps every entry, so no
    /// preview handle that history still references is released.
    pub fn clear_batch(&mut self) -> ConverterResult<()> {
        let cleared: Vec<String> = self.current_batch.drain(..).map(|r| r.id).collect();
        for id in cleared {
            self.release_if_unreferenced(&id);
        }
        self.persist()?;
        info!("Current batch cleared");
        Ok(())
    }

    /// Removes one entry from history by id; no-op if absent. The preview
    /// handle is released unless the current batch still references the id.
    pub fn remove_from_history(&mut self, id: &str) -> ConverterResult<()> {
        let before = self.history.len();
        self.history.retain(|r| r.id != id);
        if self.history.len() == before {
            return Ok(());
        }
        self.release_if_unreferenced(id);
        self.persist()?;
        debug!("Removed '{}' from history", id);
        Ok(())
    }

    /// Empties history, releasing every preview handle the current batch
    /// does not still reference.
    pub fn clear_history(&mut self) -> ConverterResult<()> {
        let cleared: Vec<String> = self.history.drain(..).map(|r| r.id).collect();
        for id in cleared {
            self.release_if_unreferenced(&id);
        }
        self.persist()?;
        info!("History cleared");
        Ok(())
    }

    /// Updates the settings persisted alongside the ledger.
    pub fn set_settings(&mut self, settings: CompressionSettings) -> ConverterResult<()> {
        self.settings = settings.clamped();
        self.persist()
    }

    /// Settings restored from the persisted document.
    pub fn settings(&self) -> CompressionSettings {
        self.settings
    }

    /// Current batch records, insertion order = processing order.
    pub fn current_batch(&self) -> &[ArtifactRecord] {
        &self.current_batch
    }

    /// History records in insertion order; display newest-first by reversing.
    pub fn history(&self) -> &[ArtifactRecord] {
        &self.history
    }

    /// The live artifact for an id, when it was produced this session.
    pub fn artifact(&self, id: &str) -> Option<Arc<ConvertedArtifact>> {
        self.live.get(id).cloned()
    }

    /// Preview bytes for an id, when its handle is still live.
    pub fn preview_bytes(&self, id: &str) -> Option<Arc<Vec<u8>>> {
        let artifact = self.live.get(id)?;
        self.previews.bytes(artifact.preview)
    }

    /// Number of live preview handles; for leak detection in tests.
    pub fn active_previews(&self) -> usize {
        self.previews.active_count()
    }

    fn referenced(&self, id: &str) -> bool {
        self.current_batch.iter().any(|r| r.id == id) || self.history.iter().any(|r| r.id == id)
    }

    /// Drops the live artifact and releases its preview handle once the id
    /// has left both views.
    fn release_if_unreferenced(&mut self, id: &str) {
        if self.referenced(id) {
            return;
        }
        if let Some(artifact) = self.live.remove(id) {
            self.previews.release(artifact.preview);
        }
    }

    fn persist(&self) -> ConverterResult<()> {
        self.store.save(&PersistedState {
            settings: self.settings,
            current_batch: self.current_batch.clone(),
            history: self.history.clone(),
        })
    }
}
