//! Persistence backends for the conversion ledger.
//!
//! The ledger persists one JSON document `{settings, currentBatch, history}`
//! under a fixed store name, loaded at startup and written through on every
//! mutation. The backend is injected so tests and embedders can swap the
//! file store for an in-memory one.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::core::{ArtifactRecord, CompressionSettings};
use crate::utils::{ConverterError, ConverterResult};

/// Fixed name of the durable store document.
pub const STORE_FILE_NAME: &str = "image-recoder.json";

/// The single durable document holding everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub settings: CompressionSettings,
    #[serde(default)]
    pub current_batch: Vec<ArtifactRecord>,
    #[serde(default)]
    pub history: Vec<ArtifactRecord>,
}

/// Durable key-value backend for the ledger document.
pub trait LedgerStore: Send + Sync {
    /// Loads the persisted state, `None` when no document exists yet.
    fn load(&self) -> ConverterResult<Option<PersistedState>>;

    /// Durably writes the full document before returning.
    fn save(&self, state: &PersistedState) -> ConverterResult<()>;
}

/// JSON file store: one document at a fixed path, written atomically via a
/// temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store document inside `dir`, under the fixed store name.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE_NAME),
        }
    }

    /// Store document at an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> ConverterResult<Option<PersistedState>> {
        if !self.path.exists() {
            debug!("No store document at {}", self.path.display());
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| ConverterError::store(format!("Failed to read store: {}", e)))?;
        match serde_json::from_str::<PersistedState>(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                // A corrupt document must not brick the app; start fresh.
                warn!("Store document at {} is corrupt ({}), starting empty", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, state: &PersistedState) -> ConverterResult<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| ConverterError::store(format!("Failed to serialize store: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ConverterError::store(format!("Failed to create store dir: {}", e)))?;
            }
        }

        // Write-then-rename so a crash mid-write never truncates the document.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| ConverterError::store(format!("Failed to write store: {}", e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| ConverterError::store(format!("Failed to commit store: {}", e)))?;
        Ok(())
    }
}

/// In-memory store for tests and embedders that manage durability themselves.
///
/// Clones share the same state, so a test can keep one clone to inspect what
/// the ledger persisted through the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    state: Option<PersistedState>,
    save_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `save` ran; used to assert write-through persistence.
    pub fn save_count(&self) -> usize {
        self.inner.lock().expect("memory store lock poisoned").save_count
    }

    /// The last persisted document, if any.
    pub fn persisted(&self) -> Option<PersistedState> {
        self.inner.lock().expect("memory store lock poisoned").state.clone()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> ConverterResult<Option<PersistedState>> {
        Ok(self.inner.lock().expect("memory store lock poisoned").state.clone())
    }

    fn save(&self, state: &PersistedState) -> ConverterResult<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.state = Some(state.clone());
        inner.save_count += 1;
        Ok(())
    }
}
