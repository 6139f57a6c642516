use crate::{AssetId, AssetKind, ContentKey};
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading an asset or configuring the pipeline.
///
/// Load errors never reach the caller directly: the orchestrator stores their
/// text on the record and moves it to `Failed`.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read '{}'", path.display())]
    FileRead { path: PathBuf },

    #[error("no data registered under content key {key}")]
    MissingContent { key: ContentKey },

    #[error("asset '{name}' has no byte source")]
    MissingBytes { name: String },

    #[error("no decoder registered for {kind} assets")]
    NoDecoder { kind: AssetKind },

    #[error("failed to decode {kind} '{name}': {message}")]
    Decode {
        kind: AssetKind,
        name: String,
        message: String,
    },

    #[error("dependency '{name}' ({id}) failed to load")]
    DependencyFailed { id: AssetId, name: String },

    #[error("dependency {id} is not registered")]
    DependencyMissing { id: AssetId },

    #[error("dependency {id} has no payload")]
    DependencyUnavailable { id: AssetId },

    #[error("{id} depends on itself through its dependency chain")]
    DependencyCycle { id: AssetId },

    #[error("{id} is nested deeper than {limit} dependency levels")]
    DependencyTooDeep { id: AssetId, limit: usize },

    #[error("asset '{name}' was unstaged while loading")]
    Unstaged { name: String },

    #[error("finalization of '{name}' failed: {message}")]
    Finalize { name: String, message: String },

    #[error("panic while {stage} '{name}': {message}")]
    Panicked {
        stage: &'static str,
        name: String,
        message: String,
    },

    #[error("invalid pipeline settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("failed to read pipeline settings: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    pub(crate) fn decode(kind: AssetKind, name: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            kind,
            name: name.to_string(),
            message: message.into(),
        }
    }
}
