//! Double-buffered queue drained on one designated thread.

use super::Task;
use std::mem;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::thread::{self, ThreadId};

/// Work items produced on any thread and consumed on the main thread.
///
/// Producers push into the write buffer. Once per tick the main thread swaps
/// the write and read buffers while holding both locks, then processes the
/// read batch with no lock held, so items may enqueue more work while they
/// run. That work is picked up on the next drain.
///
/// `T` defaults to a boxed closure; subsystems that want auditable hand-offs
/// queue their own message types instead.
pub struct MainThreadQueue<T = Task> {
    write: Mutex<Vec<T>>,
    read: Mutex<Vec<T>>,
    owner: OnceLock<ThreadId>,
}

impl<T> MainThreadQueue<T> {
    pub fn new() -> Self {
        Self {
            write: Mutex::new(Vec::new()),
            read: Mutex::new(Vec::new()),
            owner: OnceLock::new(),
        }
    }

    /// Record the calling thread as the only one allowed to drain.
    ///
    /// Returns `false` if another thread was bound first.
    pub fn bind_current_thread(&self) -> bool {
        let current = thread::current().id();
        *self.owner.get_or_init(|| current) == current
    }

    /// `true` on the bound thread, or on any thread while unbound.
    pub fn is_main_thread(&self) -> bool {
        self.owner
            .get()
            .map_or(true, |owner| *owner == thread::current().id())
    }

    /// Queue an item for the next drain. Callable from any thread.
    pub fn push(&self, item: T) {
        lock(&self.write).push(item);
    }

    /// Number of items waiting for the next drain.
    pub fn len(&self) -> usize {
        lock(&self.write).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swap buffers and hand every queued item to `f`. Returns how many items
    /// were processed.
    pub fn drain_with(&self, mut f: impl FnMut(T)) -> usize {
        debug_assert!(
            self.is_main_thread(),
            "main thread queue drained from a foreign thread"
        );

        let batch = {
            let mut write = lock(&self.write);
            let mut read = lock(&self.read);
            mem::swap(&mut *write, &mut *read);
            mem::take(&mut *read)
        };

        let count = batch.len();
        for item in batch {
            f(item);
        }
        if count > 0 {
            tracing::trace!("main thread queue processed {} items", count);
        }
        count
    }

    /// Drop everything still queued. Returns how many items were discarded.
    pub fn clear(&self) -> usize {
        let mut write = lock(&self.write);
        let mut read = lock(&self.read);
        let discarded = write.len() + read.len();
        write.clear();
        read.clear();
        discarded
    }
}

impl MainThreadQueue<Task> {
    /// Queue a closure for the main thread.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task));
    }

    /// Run every queued closure.
    pub fn drain(&self) -> usize {
        self.drain_with(|task| task())
    }
}

impl<T> Default for MainThreadQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<Vec<T>>) -> MutexGuard<'_, Vec<T>> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
