//! Decoders turn raw bytes, or the payloads of an asset's dependencies, into
//! an [`AssetPayload`].
//!
//! Decoders are pure: they run on worker threads, may allocate, and must not
//! touch the registry or spawn work of their own.

mod mesh;
mod shader;
mod texture;

pub use mesh::MeshDecoder;
pub use shader::{split_shader_source, ShaderProgramDecoder, ShaderStageDecoder};
pub use texture::TextureDecoder;

#[cfg(test)]
pub(crate) use texture::encode_png;

use crate::{AssetError, AssetKind, AssetPayload};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Everything a decoder may look at.
#[derive(Debug, Clone, Copy)]
pub struct DecodeInput<'a> {
    pub kind: AssetKind,
    pub name: &'a str,
    /// File contents or content-store bytes, if the asset has a byte source.
    pub bytes: Option<&'a [u8]>,
    /// Payloads of the asset's dependencies, in declaration order.
    pub dependencies: &'a [Arc<AssetPayload>],
}

impl<'a> DecodeInput<'a> {
    /// The byte source, or an error naming the asset.
    pub fn require_bytes(&self) -> Result<&'a [u8], AssetError> {
        self.bytes.ok_or_else(|| AssetError::MissingBytes {
            name: self.name.to_string(),
        })
    }

    pub fn error(&self, message: impl Into<String>) -> AssetError {
        AssetError::decode(self.kind, self.name, message)
    }
}

pub trait Decoder: Send + Sync {
    fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError>;
}

impl<F> Decoder for F
where
    F: Fn(DecodeInput<'_>) -> Result<AssetPayload, AssetError> + Send + Sync,
{
    fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError> {
        self(input)
    }
}

/// Keeps bytes as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError> {
        Ok(AssetPayload::Raw(Arc::from(input.require_bytes()?)))
    }
}

/// One decoder per asset kind.
pub struct DecoderSet {
    decoders: RwLock<HashMap<AssetKind, Arc<dyn Decoder>>>,
}

impl DecoderSet {
    /// A set with no decoders at all.
    pub fn empty() -> Self {
        Self {
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// A set with the built-in decoder for every kind.
    pub fn with_defaults() -> Self {
        let set = Self::empty();
        set.register(AssetKind::Texture2D, TextureDecoder);
        set.register(AssetKind::Mesh, MeshDecoder);
        set.register(AssetKind::VertexShader, ShaderStageDecoder::vertex());
        set.register(AssetKind::FragmentShader, ShaderStageDecoder::fragment());
        set.register(AssetKind::ShaderProgram, ShaderProgramDecoder);
        set.register(AssetKind::Raw, RawDecoder);
        set
    }

    /// Install `decoder` for `kind`, replacing any previous one.
    pub fn register(&self, kind: AssetKind, decoder: impl Decoder + 'static) {
        self.decoders
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(kind, Arc::new(decoder));
    }

    pub fn get(&self, kind: AssetKind) -> Option<Arc<dyn Decoder>> {
        self.decoders
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .cloned()
    }

    /// Look up the decoder for `input.kind` and run it.
    pub fn decode(&self, input: DecodeInput<'_>) -> Result<AssetPayload, AssetError> {
        let decoder = self
            .get(input.kind)
            .ok_or(AssetError::NoDecoder { kind: input.kind })?;
        decoder.decode(input)
    }
}

impl Default for DecoderSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}
