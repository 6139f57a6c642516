//! Decoded asset data.

use std::fmt;
use std::sync::Arc;

/// Opaque id of a resource created by the host's graphics context during
/// finalization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GpuHandle(pub u64);

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl ShaderStageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStageKind::Vertex => "vertex",
            ShaderStageKind::Fragment => "fragment",
        }
    }
}

/// CPU-side texture, always RGBA8.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture2D {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub gpu: Option<GpuHandle>,
}

impl fmt::Debug for Texture2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture2D")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .field("gpu", &self.gpu)
            .finish()
    }
}

/// Source of one shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStage {
    pub stage: ShaderStageKind,
    pub source: String,
    pub gpu: Option<GpuHandle>,
}

/// A vertex/fragment pair ready to be linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    pub vertex_source: String,
    pub fragment_source: String,
    pub gpu: Option<GpuHandle>,
}

/// Indexed triangle mesh. `positions`, `normals` and `texcoords` share one
/// index space; `normals` and `texcoords` are empty when the source has none.
#[derive(Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub gpu: Option<GpuHandle>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("vertices", &self.positions.len())
            .field("normals", &self.normals.len())
            .field("texcoords", &self.texcoords.len())
            .field("indices", &self.indices.len())
            .field("gpu", &self.gpu)
            .finish()
    }
}

/// Everything a record can hold once loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    Texture(Texture2D),
    Mesh(Mesh),
    Shader(ShaderStage),
    ShaderProgram(ShaderProgram),
    Raw(Arc<[u8]>),
}

impl AssetPayload {
    pub fn as_texture(&self) -> Option<&Texture2D> {
        match self {
            AssetPayload::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            AssetPayload::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_shader(&self) -> Option<&ShaderStage> {
        match self {
            AssetPayload::Shader(shader) => Some(shader),
            _ => None,
        }
    }

    pub fn as_shader_program(&self) -> Option<&ShaderProgram> {
        match self {
            AssetPayload::ShaderProgram(program) => Some(program),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AssetPayload::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// GPU resource attached during finalization, if any.
    pub fn gpu_handle(&self) -> Option<GpuHandle> {
        match self {
            AssetPayload::Texture(texture) => texture.gpu,
            AssetPayload::Mesh(mesh) => mesh.gpu,
            AssetPayload::Shader(shader) => shader.gpu,
            AssetPayload::ShaderProgram(program) => program.gpu,
            AssetPayload::Raw(_) => None,
        }
    }

    /// Attach a GPU resource. Raw payloads have nowhere to store one.
    pub fn set_gpu_handle(&mut self, handle: GpuHandle) {
        match self {
            AssetPayload::Texture(texture) => texture.gpu = Some(handle),
            AssetPayload::Mesh(mesh) => mesh.gpu = Some(handle),
            AssetPayload::Shader(shader) => shader.gpu = Some(handle),
            AssetPayload::ShaderProgram(program) => program.gpu = Some(handle),
            AssetPayload::Raw(_) => {}
        }
    }
}
