//! Latch Asset Pipeline
//!
//! Staging, background decoding, main-thread finalization and release of
//! engine assets (textures, meshes, shaders, raw blobs).
//!
//! Everything hangs off one [`AssetPipeline`] instance owned by the host:
//!
//! ```no_run
//! use latch_asset::{AssetKind, AssetPipeline, PipelineSettings};
//!
//! let pipeline = AssetPipeline::new(PipelineSettings::default());
//! pipeline.init();
//! let brick = pipeline
//!     .stage_file(AssetKind::Texture2D, "brick", "textures/brick.png")
//!     .unwrap();
//! pipeline.load(&[brick.id()]);
//! while !brick.state().is_settled() {
//!     pipeline.on_update();
//! }
//! ```

pub mod decode;
pub mod event;
pub mod file_io;
pub mod finalize;

mod content;
mod error;
mod kind;
mod payload;
mod pipeline;
mod record;
mod registry;
mod settings;

pub use content::{ContentKey, ContentStore};
pub use error::AssetError;
pub use event::{AssetEvent, AssetEventKind, ListenerId};
pub use kind::{AssetKind, AssetState};
pub use payload::{
    AssetPayload, GpuHandle, Mesh, ShaderProgram, ShaderStage, ShaderStageKind, Texture2D,
};
pub use pipeline::{AssetPipeline, CompletionCallback};
pub use record::{AssetHandle, AssetId, AssetInfo, AssetRecord, StageRequest};
pub use registry::{content_hash, AssetRegistry, StageOutcome};
pub use settings::PipelineSettings;
