//! Where file-backed assets get their bytes.

use std::fs;
use std::path::{Path, PathBuf};

/// Reads whole files for the decode step. Runs on worker threads.
pub trait FileSource: Send + Sync {
    /// The file's bytes, or an empty buffer if it cannot be read.
    fn load_file(&self, path: &Path) -> Vec<u8>;
}

/// Reads from the local file system, resolving relative paths against an
/// optional root directory.
#[derive(Debug, Clone, Default)]
pub struct DiskFileSource {
    root: Option<PathBuf>,
}

impl DiskFileSource {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl FileSource for DiskFileSource {
    fn load_file(&self, path: &Path) -> Vec<u8> {
        let resolved = self.resolve(path);
        match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("failed to read '{}': {}", resolved.display(), err);
                Vec::new()
            }
        }
    }
}
