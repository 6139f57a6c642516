use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The closed set of asset kinds the pipeline knows how to decode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Texture2D,
    Mesh,
    VertexShader,
    FragmentShader,
    ShaderProgram,
    Raw,
}

impl AssetKind {
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Texture2D,
        AssetKind::Mesh,
        AssetKind::VertexShader,
        AssetKind::FragmentShader,
        AssetKind::ShaderProgram,
        AssetKind::Raw,
    ];

    /// Stable tag mixed into content hashes and shown in logs.
    pub fn tag(self) -> &'static str {
        match self {
            AssetKind::Texture2D => "Texture2D",
            AssetKind::Mesh => "Mesh",
            AssetKind::VertexShader => "VertexShader",
            AssetKind::FragmentShader => "FragmentShader",
            AssetKind::ShaderProgram => "ShaderProgram",
            AssetKind::Raw => "Raw",
        }
    }

    /// Whether a decoded payload of this kind must be finalized on the main
    /// thread before it is usable (GPU upload, program linking).
    pub fn requires_finalization(self) -> bool {
        !matches!(self, AssetKind::Raw)
    }

    /// Guess the kind from a file extension. Unknown extensions load as `Raw`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("png" | "jpg" | "jpeg" | "bmp" | "tga") => AssetKind::Texture2D,
            Some("obj") => AssetKind::Mesh,
            Some("vert" | "vs") => AssetKind::VertexShader,
            Some("frag" | "fs") => AssetKind::FragmentShader,
            Some("glsl" | "shader") => AssetKind::ShaderProgram,
            _ => AssetKind::Raw,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lifecycle of one asset record.
///
/// `None → Staged → Loading → {Loaded | Failed}`; `Loaded | Failed → Staged`
/// only through an explicit unload. `None` also marks a record that has been
/// unstaged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AssetState {
    #[default]
    None,
    Staged,
    Loading,
    Loaded,
    Failed,
}

impl AssetState {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetState::None => "None",
            AssetState::Staged => "Staged",
            AssetState::Loading => "Loading",
            AssetState::Loaded => "Loaded",
            AssetState::Failed => "Failed",
        }
    }

    /// `Loaded` or `Failed`.
    pub fn is_settled(self) -> bool {
        matches!(self, AssetState::Loaded | AssetState::Failed)
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
