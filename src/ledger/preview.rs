//! Revocable preview handles over output byte buffers.
//!
//! Models the browser's object-URL lifecycle explicitly: a handle is a
//! scarce, process-wide reference into memory that must be released exactly
//! once when its owning artifact leaves every ledger view. Leaking handles
//! is a defect; [`PreviewRegistry::active_count`] exists so tests can prove
//! none leaked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Opaque, copyable reference to a registered preview buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle(u64);

/// Registry mapping live handles to their byte buffers.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    entries: Mutex<HashMap<u64, Arc<Vec<u8>>>>,
    next_id: AtomicU64,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a buffer and returns its handle.
    pub fn register(&self, bytes: Arc<Vec<u8>>) -> PreviewHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .expect("preview registry lock poisoned")
            .insert(id, bytes);
        PreviewHandle(id)
    }

    /// The bytes behind a handle, or `None` once it has been released.
    pub fn bytes(&self, handle: PreviewHandle) -> Option<Arc<Vec<u8>>> {
        self.entries
            .lock()
            .expect("preview registry lock poisoned")
            .get(&handle.0)
            .cloned()
    }

    /// Revokes a handle. Returns `false` (and logs) when the handle was
    /// already released; the double release is a no-op, never a double free.
    pub fn release(&self, handle: PreviewHandle) -> bool {
        let removed = self
            .entries
            .lock()
            .expect("preview registry lock poisoned")
            .remove(&handle.0)
            .is_some();
        if !removed {
            warn!("Preview handle {} released twice", handle.0);
        }
        removed
    }

    pub fn is_active(&self, handle: PreviewHandle) -> bool {
        self.entries
            .lock()
            .expect("preview registry lock poisoned")
            .contains_key(&handle.0)
    }

    /// Number of live handles; zero after every owning artifact is removed.
    pub fn active_count(&self) -> usize {
        self.entries
            .lock()
            .expect("preview registry lock poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_release_exactly_once() {
        let registry = PreviewRegistry::new();
        let handle = registry.register(Arc::new(vec![1, 2, 3]));

        assert!(registry.is_active(handle));
        assert_eq!(registry.bytes(handle).unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(registry.active_count(), 1);

        assert!(registry.release(handle));
        assert!(!registry.is_active(handle));
        assert_eq!(registry.active_count(), 0);
        assert!(registry.bytes(handle).is_none());
    }

    #[test]
    fn double_release_is_a_noop() {
        let registry = PreviewRegistry::new();
        let handle = registry.register(Arc::new(vec![0]));
        assert!(registry.release(handle));
        assert!(!registry.release(handle));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn handles_are_distinct() {
        let registry = PreviewRegistry::new();
        let a = registry.register(Arc::new(vec![1]));
        let b = registry.register(Arc::new(vec![2]));
        assert_ne!(a, b);
        registry.release(a);
        assert!(registry.is_active(b));
    }
}
