//! Per-asset lifecycle record.

use crate::{AssetKind, AssetPayload, AssetState, ContentKey};
use std::fmt;
use std::mem;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-unique asset id. Starts at 1 and is never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u32);

impl AssetId {
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset {}", self.0)
    }
}

/// Shared handle to a registered record.
pub type AssetHandle = Arc<AssetRecord>;

/// What to stage: a kind, a requested name and at least one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRequest {
    pub kind: AssetKind,
    pub name: String,
    pub path: Option<PathBuf>,
    pub content: Option<ContentKey>,
    pub dependencies: Vec<AssetId>,
}

impl StageRequest {
    /// An asset decoded from a file.
    pub fn file(kind: AssetKind, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
            path: Some(path.into()),
            content: None,
            dependencies: Vec::new(),
        }
    }

    /// An asset decoded from bytes already in the content store.
    pub fn memory(kind: AssetKind, name: impl Into<String>, key: ContentKey) -> Self {
        Self {
            kind,
            name: name.into(),
            path: None,
            content: Some(key),
            dependencies: Vec::new(),
        }
    }

    /// An asset built from other, already staged assets.
    pub fn composite(kind: AssetKind, name: impl Into<String>, dependencies: Vec<AssetId>) -> Self {
        Self {
            kind,
            name: name.into(),
            path: None,
            content: None,
            dependencies,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<AssetId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// A path, a content key or at least one dependency.
    pub fn has_source(&self) -> bool {
        let has_path = self
            .path
            .as_deref()
            .is_some_and(|path| !path.as_os_str().is_empty());
        has_path || self.content.is_some() || !self.dependencies.is_empty()
    }
}

/// Continuation run once a record leaves `Staged`/`Loading` for good.
pub(crate) type Waiter = Box<dyn FnOnce(AssetState) + Send + Sync + 'static>;

struct RecordInner {
    name: String,
    path: Option<PathBuf>,
    content: Option<ContentKey>,
    dependencies: Vec<AssetId>,
    state: AssetState,
    payload: Option<Arc<AssetPayload>>,
    message: Option<String>,
    /// Buffer registered from a file read; released on unload.
    owned_content: Option<ContentKey>,
    waiters: Vec<Waiter>,
}

/// One logical resource: metadata, lifecycle state and the decoded payload.
///
/// Every mutable field sits behind one reader/writer lock. Mutation is
/// crate-private; the registry and the load orchestrator are the only writers.
pub struct AssetRecord {
    id: AssetId,
    kind: AssetKind,
    content_hash: u64,
    inner: RwLock<RecordInner>,
}

/// Consistent copy of a record's descriptive fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub id: AssetId,
    pub kind: AssetKind,
    pub name: String,
    pub path: Option<PathBuf>,
    pub state: AssetState,
    pub message: Option<String>,
}

impl AssetRecord {
    pub(crate) fn new(id: AssetId, name: String, content_hash: u64, request: StageRequest) -> Self {
        Self {
            id,
            kind: request.kind,
            content_hash,
            inner: RwLock::new(RecordInner {
                name,
                path: request.path,
                content: request.content,
                dependencies: request.dependencies,
                state: AssetState::Staged,
                payload: None,
                message: None,
                owned_content: None,
                waiters: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.read().path.clone()
    }

    pub fn content_key(&self) -> Option<ContentKey> {
        self.read().content
    }

    pub fn dependencies(&self) -> Vec<AssetId> {
        self.read().dependencies.clone()
    }

    pub fn state(&self) -> AssetState {
        self.read().state
    }

    /// Installed payload. Present only while `Loaded`.
    pub fn payload(&self) -> Option<Arc<AssetPayload>> {
        self.read().payload.clone()
    }

    pub fn has_payload(&self) -> bool {
        self.read().payload.is_some()
    }

    /// Failure text captured when the record moved to `Failed`.
    pub fn message(&self) -> Option<String> {
        self.read().message.clone()
    }

    pub fn info(&self) -> AssetInfo {
        self.snapshot(&self.read())
    }

    fn snapshot(&self, inner: &RecordInner) -> AssetInfo {
        AssetInfo {
            id: self.id,
            kind: self.kind,
            name: inner.name.clone(),
            path: inner.path.clone(),
            state: inner.state,
            message: inner.message.clone(),
        }
    }

    /// `Staged → Loading` as one step. Only the caller that wins gets `true`.
    pub(crate) fn try_begin_loading(&self) -> bool {
        let mut inner = self.write();
        if inner.state != AssetState::Staged {
            return false;
        }
        inner.state = AssetState::Loading;
        true
    }

    /// `Staged → Failed` for a record that cannot start loading.
    pub(crate) fn fail_staged(&self, message: String) -> Option<Settled> {
        let mut inner = self.write();
        if inner.state != AssetState::Staged {
            return None;
        }
        inner.state = AssetState::Failed;
        inner.message = Some(message);
        Some(Settled {
            info: self.snapshot(&inner),
            waiters: mem::take(&mut inner.waiters),
        })
    }

    /// `Loading → Loaded | Failed`. Returns the settled snapshot and the
    /// waiters to wake, or `None` if the record was no longer loading.
    pub(crate) fn finish_loading(&self, result: Result<AssetPayload, String>) -> Option<Settled> {
        let mut inner = self.write();
        if inner.state != AssetState::Loading {
            return None;
        }
        match result {
            Ok(payload) => {
                inner.state = AssetState::Loaded;
                inner.payload = Some(Arc::new(payload));
                inner.message = None;
            }
            Err(message) => {
                inner.state = AssetState::Failed;
                inner.payload = None;
                inner.message = Some(message);
            }
        }
        Some(Settled {
            info: self.snapshot(&inner),
            waiters: mem::take(&mut inner.waiters),
        })
    }

    /// Park `waiter` until the record settles. If it already has (or was
    /// unstaged), the waiter is handed back with the current state.
    pub(crate) fn wait_until_settled(&self, waiter: Waiter) -> Result<(), (Waiter, AssetState)> {
        let mut inner = self.write();
        match inner.state {
            AssetState::Staged | AssetState::Loading => {
                inner.waiters.push(waiter);
                Ok(())
            }
            state => Err((waiter, state)),
        }
    }

    /// Remember the buffer a file read produced and return the previous one.
    /// Only a `Loading` record takes ownership; otherwise `key` is handed back.
    pub(crate) fn replace_owned_content(
        &self,
        key: ContentKey,
    ) -> Result<Option<ContentKey>, ContentKey> {
        let mut inner = self.write();
        if inner.state != AssetState::Loading {
            return Err(key);
        }
        Ok(inner.owned_content.replace(key))
    }

    pub(crate) fn take_owned_content(&self) -> Option<ContentKey> {
        self.write().owned_content.take()
    }

    /// `Loaded | Failed → Staged`, dropping the payload. Returns the owned
    /// buffer to release, or `Err(state)` if the record was not settled.
    pub(crate) fn unload(&self) -> Result<Option<ContentKey>, AssetState> {
        let mut inner = self.write();
        if !inner.state.is_settled() {
            return Err(inner.state);
        }
        inner.state = AssetState::Staged;
        inner.payload = None;
        inner.message = None;
        Ok(inner.owned_content.take())
    }

    /// Reset every field after the record left the registry.
    pub(crate) fn clear(&self) -> ClearedRecord {
        let mut inner = self.write();
        let cleared = ClearedRecord {
            had_payload: inner.payload.is_some(),
            owned_content: inner.owned_content.take(),
            waiters: mem::take(&mut inner.waiters),
        };
        inner.state = AssetState::None;
        inner.payload = None;
        inner.message = None;
        inner.path = None;
        inner.content = None;
        inner.dependencies.clear();
        cleared
    }

    fn read(&self) -> RwLockReadGuard<'_, RecordInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for AssetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("AssetRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &inner.name)
            .field("state", &inner.state)
            .field("dependencies", &inner.dependencies)
            .finish()
    }
}

/// A record that just reached `Loaded` or `Failed`, as it looked at that
/// moment.
pub(crate) struct Settled {
    pub info: AssetInfo,
    pub waiters: Vec<Waiter>,
}

pub(crate) struct ClearedRecord {
    pub had_payload: bool,
    pub owned_content: Option<ContentKey>,
    pub waiters: Vec<Waiter>,
}
