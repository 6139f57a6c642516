//! Authoritative id → record map plus the secondary indexes used for
//! deduplication and lookup.

use crate::{AssetHandle, AssetId, AssetKind, AssetRecord, StageRequest};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Result of a successful [`AssetRegistry::stage`].
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// A new record was allocated.
    Created(AssetHandle),
    /// A live record with the same content hash already existed.
    Existing(AssetHandle),
}

impl StageOutcome {
    pub fn handle(&self) -> &AssetHandle {
        match self {
            StageOutcome::Created(handle) | StageOutcome::Existing(handle) => handle,
        }
    }

    pub fn into_handle(self) -> AssetHandle {
        match self {
            StageOutcome::Created(handle) | StageOutcome::Existing(handle) => handle,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, StageOutcome::Created(_))
    }
}

struct RegistryMaps {
    next_id: u32,
    records: HashMap<AssetId, AssetHandle>,
    names: HashMap<String, AssetId>,
    hashes: HashMap<u64, AssetId>,
    /// Last id staged per kind. Only used to check for existence.
    kinds: HashMap<AssetKind, AssetId>,
}

/// Owns every staged [`AssetRecord`].
///
/// All four maps change together under one write lock, so a reader never sees
/// a record that is missing from one of the indexes.
pub struct AssetRegistry {
    maps: RwLock<RegistryMaps>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(RegistryMaps {
                next_id: 1,
                records: HashMap::new(),
                names: HashMap::new(),
                hashes: HashMap::new(),
                kinds: HashMap::new(),
            }),
        }
    }

    /// Register a request, or return the live record with the same content.
    ///
    /// A request without any source, or one naming an unknown dependency, is a
    /// programmer error: it asserts in debug builds and returns `None` in
    /// release builds.
    pub fn stage(&self, request: StageRequest) -> Option<StageOutcome> {
        if !request.has_source() {
            tracing::error!(
                "cannot stage '{}': no path, content key or dependency given",
                request.name
            );
            debug_assert!(false, "asset '{}' staged without a source", request.name);
            return None;
        }

        let hash = content_hash(&request);
        let mut maps = self.write();

        if let Some(existing) = maps.hashes.get(&hash).and_then(|id| maps.records.get(id)) {
            tracing::debug!(
                "'{}' matches already staged {} ('{}')",
                request.name,
                existing.id(),
                existing.name()
            );
            return Some(StageOutcome::Existing(Arc::clone(existing)));
        }

        if let Some(missing) = request
            .dependencies
            .iter()
            .find(|dep| !maps.records.contains_key(*dep))
        {
            tracing::error!(
                "cannot stage '{}': dependency {} is not registered",
                request.name,
                missing
            );
            debug_assert!(false, "asset '{}' depends on unknown {}", request.name, missing);
            return None;
        }

        let id = AssetId::new(maps.next_id);
        maps.next_id += 1;

        let name = unique_name(&request.name, &maps.names);
        if name != request.name {
            tracing::debug!("name '{}' taken; staging as '{}'", request.name, name);
        }

        let kind = request.kind;
        let record = Arc::new(AssetRecord::new(id, name.clone(), hash, request));
        maps.records.insert(id, Arc::clone(&record));
        maps.names.insert(name, id);
        maps.hashes.insert(hash, id);
        maps.kinds.insert(kind, id);

        Some(StageOutcome::Created(record))
    }

    /// Remove a record from every map and return it.
    pub(crate) fn remove(&self, id: AssetId) -> Option<AssetHandle> {
        let mut maps = self.write();
        let record = maps.records.remove(&id)?;

        let name = record.name();
        if maps.names.get(&name) == Some(&id) {
            maps.names.remove(&name);
        }
        if maps.hashes.get(&record.content_hash()) == Some(&id) {
            maps.hashes.remove(&record.content_hash());
        }
        if maps.kinds.get(&record.kind()) == Some(&id) {
            maps.kinds.remove(&record.kind());
        }
        Some(record)
    }

    pub fn get(&self, id: AssetId) -> Option<AssetHandle> {
        self.read().records.get(&id).cloned()
    }

    pub fn find(&self, name: &str) -> Option<AssetHandle> {
        let maps = self.read();
        maps.names.get(name).and_then(|id| maps.records.get(id)).cloned()
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.read().records.contains_key(&id)
    }

    /// Fast check: has any asset of this kind been staged (and not the most
    /// recent one unstaged)?
    pub fn contains_kind(&self, kind: AssetKind) -> bool {
        self.read().kinds.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live record, ordered by id.
    pub fn records(&self) -> Vec<AssetHandle> {
        let mut records: Vec<_> = self.read().records.values().cloned().collect();
        records.sort_by_key(|record| record.id());
        records
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryMaps> {
        self.maps.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryMaps> {
        self.maps.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a request: kind, path or content key, and dependency ids.
/// The requested name does not take part.
pub fn content_hash(request: &StageRequest) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(request.kind.tag().as_bytes());
    hasher.update(&[0]);
    if let Some(path) = &request.path {
        hasher.update(b"path:");
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
    }
    if let Some(key) = request.content {
        hasher.update(b"content:");
        hasher.update(&key.get().to_le_bytes());
    }
    hasher.update(b"deps:");
    for dep in &request.dependencies {
        hasher.update(&dep.get().to_le_bytes());
    }

    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// `name`, or `name` with its numeric suffix bumped until nothing collides.
/// `brick` becomes `brick_1`, `brick_1` becomes `brick_2`, `layer9` becomes
/// `layer10`.
fn unique_name(name: &str, taken: &HashMap<String, AssetId>) -> String {
    if !taken.contains_key(name) {
        return name.to_string();
    }

    let stem_len = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (mut stem, mut counter) = match name[stem_len..].parse::<u64>() {
        Ok(n) if stem_len < name.len() => (name[..stem_len].to_string(), n),
        _ => (format!("{name}_"), 0),
    };

    loop {
        match counter.checked_add(1) {
            Some(next) => counter = next,
            None => {
                stem = format!("{name}_");
                counter = 1;
            }
        }
        let candidate = format!("{stem}{counter}");
        if !taken.contains_key(&candidate) {
            return candidate;
        }
    }
}
