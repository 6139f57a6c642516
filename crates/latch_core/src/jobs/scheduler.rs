//! Fixed-size worker pool.

use super::Task;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Number of workers used when the caller asks for `0` threads.
pub fn default_thread_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

struct QueueState {
    tasks: VecDeque<Task>,
    running: bool,
    shutdown_requested: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Tasks never run under this lock, so a poisoned guard still holds a
        // consistent queue.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A pool of persistent worker threads pulling from one shared FIFO queue.
///
/// Workers sleep on a condition variable while the queue is empty and wake on
/// [`submit`](Self::submit) or [`shutdown`](Self::shutdown). A task that
/// panics is logged and its worker moves on to the next one.
///
/// Submitting while the pool is not running (before [`init`](Self::init) or
/// after [`shutdown`](Self::shutdown)) runs the task synchronously on the
/// caller's thread; work is never silently dropped at runtime. Tasks still
/// queued when `shutdown` is called are discarded.
pub struct TaskScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScheduler {
    /// Create a scheduler with no workers. Call [`init`](Self::init) to start it.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    tasks: VecDeque::new(),
                    running: false,
                    shutdown_requested: false,
                }),
                available: Condvar::new(),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn `thread_count` workers (`0` = hardware concurrency).
    ///
    /// Calling `init` on a running scheduler is a no-op. A scheduler that was
    /// shut down can be started again.
    pub fn init(&self, thread_count: usize) {
        let mut workers = self.lock_workers();
        if !workers.is_empty() {
            tracing::debug!("task scheduler already running with {} workers", workers.len());
            return;
        }

        let thread_count = if thread_count == 0 {
            default_thread_count()
        } else {
            thread_count
        };

        {
            let mut state = self.shared.lock();
            state.shutdown_requested = false;
        }

        for index in 0..thread_count {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("latch-worker-{index}"))
                .spawn(move || worker_loop(shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => tracing::error!("failed to spawn worker thread {}: {}", index, err),
            }
        }

        if workers.is_empty() {
            tracing::warn!("no worker threads could be started; tasks will run inline");
            return;
        }

        self.shared.lock().running = true;
        tracing::info!("task scheduler started with {} workers", workers.len());
    }

    /// Queue a task for a worker, or run it inline if the pool is not running.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        if !state.running {
            drop(state);
            tracing::trace!("task scheduler not running; executing task inline");
            task();
            return;
        }
        state.tasks.push_back(Box::new(task));
        drop(state);
        self.shared.available.notify_one();
    }

    /// Stop every worker, join them and discard tasks that never started.
    ///
    /// Safe to call more than once. When called from one of the pool's own
    /// workers, that worker is detached instead of joined.
    pub fn shutdown(&self) {
        let mut workers = self.lock_workers();
        if workers.is_empty() {
            return;
        }

        let discarded = {
            let mut state = self.shared.lock();
            state.running = false;
            state.shutdown_requested = true;
            let discarded = state.tasks.len();
            state.tasks.clear();
            discarded
        };
        self.shared.available.notify_all();

        let current = thread::current().id();
        for handle in workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("worker thread panicked before shutdown");
            }
        }

        if discarded > 0 {
            tracing::warn!("task scheduler discarded {} queued tasks at shutdown", discarded);
        }
        tracing::info!("task scheduler stopped");
    }

    /// Whether submitted tasks currently go to worker threads.
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Number of live worker threads.
    pub fn thread_count(&self) -> usize {
        self.lock_workers().len()
    }

    /// Number of tasks waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.lock();
            while !state.shutdown_requested && state.tasks.is_empty() {
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            if state.shutdown_requested {
                return;
            }
            match state.tasks.pop_front() {
                Some(task) => task,
                None => continue,
            }
        };
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            tracing::error!(
                "task panicked on worker '{}'",
                thread::current().name().unwrap_or("unnamed")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn submit_before_init_runs_inline() {
        let scheduler = TaskScheduler::new();
        let caller = thread::current().id();
        let (tx, rx) = mpsc::channel();

        scheduler.submit(move || {
            tx.send(thread::current().id()).unwrap();
        });

        assert_eq!(rx.try_recv().unwrap(), caller);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn workers_run_every_task() {
        let scheduler = TaskScheduler::new();
        scheduler.init(4);
        assert_eq!(scheduler.thread_count(), 4);

        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        for _ in 0..64 {
            let counter = Arc::clone(&counter);
            let tx = tx.clone();
            scheduler.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            });
        }
        for _ in 0..64 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 64);
        scheduler.shutdown();
    }

    #[test]
    fn tasks_run_off_the_calling_thread() {
        let scheduler = TaskScheduler::new();
        scheduler.init(1);
        let caller = thread::current().id();
        let (tx, rx) = mpsc::channel();

        scheduler.submit(move || {
            tx.send(thread::current().id()).unwrap();
        });

        let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(worker, caller);
    }

    #[test]
    fn shutdown_discards_queued_tasks() {
        let scheduler = TaskScheduler::new();
        scheduler.init(1);

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        scheduler.submit(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        });
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let ran = Arc::clone(&ran);
            scheduler.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(scheduler.pending(), 8);

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            release_tx.send(()).unwrap();
        });
        scheduler.shutdown();
        releaser.join().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.thread_count(), 0);
    }

    #[test]
    fn workers_survive_panicking_tasks() {
        let scheduler = TaskScheduler::new();
        scheduler.init(1);

        scheduler.submit(|| panic!("task failure"));
        let (tx, rx) = mpsc::channel();
        scheduler.submit(move || {
            tx.send(()).unwrap();
        });

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(scheduler.thread_count(), 1);
        scheduler.shutdown();
    }

    #[test]
    fn submit_after_shutdown_runs_inline() {
        let scheduler = TaskScheduler::new();
        scheduler.init(2);
        scheduler.shutdown();

        let ran = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&ran);
        scheduler.submit(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn init_twice_keeps_first_pool() {
        let scheduler = TaskScheduler::new();
        scheduler.init(2);
        scheduler.init(6);
        assert_eq!(scheduler.thread_count(), 2);
        scheduler.shutdown();

        scheduler.init(3);
        assert_eq!(scheduler.thread_count(), 3);
        assert!(scheduler.is_running());
    }
}
