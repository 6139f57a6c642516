//! Job services shared by engine subsystems.
//!
//! - [`TaskScheduler`]: a fixed pool of persistent worker threads fed from one
//!   FIFO queue. Used for work that must stay off the calling thread.
//! - [`MainThreadQueue`]: a double-buffered queue drained once per tick on the
//!   thread that owns non-thread-safe resources (graphics context, UI).

mod main_thread;
mod scheduler;

pub use main_thread::MainThreadQueue;
pub use scheduler::{default_thread_count, TaskScheduler};

/// A unit of work that can be moved to another thread and run once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;
