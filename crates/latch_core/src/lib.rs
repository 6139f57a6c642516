//! Latch Engine Core
//!
//! Engine-wide services shared by the subsystem crates:
//! - Background job scheduler
//! - Main-thread work queue

pub mod jobs;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
