//! Asset lifecycle events and the listener hub that delivers them.

use crate::{AssetId, AssetInfo, AssetKind, AssetRecord, AssetState};
use latch_core::jobs::MainThreadQueue;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// What happened to an asset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssetEventKind {
    Staged,
    Loading,
    Loaded,
    Failed,
    Unloaded,
    Unstaged,
}

/// Snapshot of a record taken when the event was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEvent {
    pub kind: AssetEventKind,
    pub id: AssetId,
    pub asset_kind: AssetKind,
    pub name: String,
    pub path: Option<PathBuf>,
    pub state: AssetState,
    pub message: Option<String>,
}

impl AssetEvent {
    pub(crate) fn from_record(kind: AssetEventKind, record: &AssetRecord) -> Self {
        Self::from_info(kind, record.info())
    }

    pub(crate) fn from_info(kind: AssetEventKind, info: AssetInfo) -> Self {
        Self {
            kind,
            id: info.id,
            asset_kind: info.kind,
            name: info.name,
            path: info.path,
            state: info.state,
            message: info.message,
        }
    }

    pub fn state_str(&self) -> &'static str {
        self.state.as_str()
    }
}

/// Id returned by listener registration, used to remove it again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener {}", self.0)
    }
}

pub type Listener = Arc<dyn Fn(&AssetEvent) + Send + Sync + 'static>;

#[derive(Default)]
struct Registrations {
    scoped: HashMap<String, Vec<(ListenerId, Listener)>>,
    global: Vec<(ListenerId, Listener)>,
}

struct Notification {
    listener: Listener,
    event: Arc<AssetEvent>,
}

/// Fans asset events out to listeners on the main thread.
///
/// [`notify`](Self::notify) may be called from any thread: it resolves the
/// listeners interested in the event right away and queues one notification
/// per listener. [`dispatch`](Self::dispatch) runs them on the main thread.
pub struct ListenerHub {
    next_id: AtomicU64,
    registrations: RwLock<Registrations>,
    pending: MainThreadQueue<Notification>,
}

impl ListenerHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            registrations: RwLock::new(Registrations::default()),
            pending: MainThreadQueue::new(),
        }
    }

    /// Listen to events of the asset currently named `name`.
    pub fn add_scoped<F>(&self, name: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&AssetEvent) + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.write()
            .scoped
            .entry(name.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Listen to events of every asset.
    pub fn add_global<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AssetEvent) + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.write().global.push((id, Arc::new(listener)));
        id
    }

    /// Deregister a listener. Unknown ids are a no-op with a warning.
    /// Notifications already queued for it are still delivered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registrations = self.write();

        let before = registrations.global.len();
        registrations.global.retain(|(entry, _)| *entry != id);
        let mut removed = registrations.global.len() != before;

        if !removed {
            for listeners in registrations.scoped.values_mut() {
                let before = listeners.len();
                listeners.retain(|(entry, _)| *entry != id);
                if listeners.len() != before {
                    removed = true;
                    break;
                }
            }
            registrations.scoped.retain(|_, listeners| !listeners.is_empty());
        }

        if !removed {
            tracing::warn!("{} is not registered; nothing removed", id);
        }
        removed
    }

    /// Queue `event` for every listener interested in it.
    pub fn notify(&self, event: AssetEvent) {
        tracing::debug!("{} '{}': {:?}", event.id, event.name, event.kind);

        let event = Arc::new(event);
        let registrations = self.read();
        let scoped = registrations
            .scoped
            .get(&event.name)
            .into_iter()
            .flatten();
        for (_, listener) in scoped.chain(registrations.global.iter()) {
            self.pending.push(Notification {
                listener: Arc::clone(listener),
                event: Arc::clone(&event),
            });
        }
    }

    /// Deliver queued notifications. Main thread only.
    pub fn dispatch(&self) -> usize {
        self.pending
            .drain_with(|notification| (notification.listener)(&notification.event))
    }

    pub(crate) fn bind_current_thread(&self) -> bool {
        self.pending.bind_current_thread()
    }

    /// Notifications waiting for the next dispatch.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn listener_count(&self) -> usize {
        let registrations = self.read();
        registrations.global.len()
            + registrations
                .scoped
                .values()
                .map(|listeners| listeners.len())
                .sum::<usize>()
    }

    /// Drop every listener and every undelivered notification.
    pub fn clear(&self) {
        let mut registrations = self.write();
        registrations.global.clear();
        registrations.scoped.clear();
        drop(registrations);
        self.pending.clear();
    }

    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn read(&self) -> RwLockReadGuard<'_, Registrations> {
        self.registrations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registrations> {
        self.registrations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ListenerHub {
    fn default() -> Self {
        Self::new()
    }
}
