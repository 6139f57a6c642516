//! Keyed storage for raw byte buffers.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Key of a buffer in the [`ContentStore`]. Never reused within a process run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey(u32);

impl ContentKey {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread-safe registry of owned byte buffers.
///
/// Records staged from memory only borrow a key; the bytes stay here until
/// [`unregister`](Self::unregister). Reads hand out a shared `Arc<[u8]>`, so a
/// reader keeps its copy alive even if the key is released afterwards.
pub struct ContentStore {
    next_key: AtomicU32,
    buffers: DashMap<ContentKey, Arc<[u8]>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            next_key: AtomicU32::new(1),
            buffers: DashMap::new(),
        }
    }

    /// Take ownership of `bytes` and return its key.
    pub fn register(&self, bytes: impl Into<Arc<[u8]>>) -> ContentKey {
        let key = ContentKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        let bytes = bytes.into();
        tracing::trace!("registered {} bytes under content key {}", bytes.len(), key);
        self.buffers.insert(key, bytes);
        key
    }

    /// Copy `bytes` into a new owned buffer and return its key.
    pub fn register_slice(&self, bytes: &[u8]) -> ContentKey {
        self.register(Arc::<[u8]>::from(bytes))
    }

    /// Bytes registered under `key`, or an empty buffer for an unknown key.
    /// Callers must check the length.
    pub fn get(&self, key: ContentKey) -> Arc<[u8]> {
        self.buffers
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_else(|| Arc::from(Vec::<u8>::new()))
    }

    pub fn contains(&self, key: ContentKey) -> bool {
        self.buffers.contains_key(&key)
    }

    /// Release the buffer. Returns `false` if the key was unknown.
    pub fn unregister(&self, key: ContentKey) -> bool {
        let removed = self.buffers.remove(&key).is_some();
        if removed {
            tracing::trace!("released content key {}", key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total bytes currently held.
    pub fn total_bytes(&self) -> usize {
        self.buffers.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}
