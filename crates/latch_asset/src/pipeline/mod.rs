//! The asset pipeline: one explicit instance per host application.
//!
//! Data flow:
//! caller → [`AssetPipeline::stage`] → [`AssetPipeline::load`] → worker thread
//! (read + decode) → main thread ([`AssetPipeline::on_update`]: finalize,
//! completion callbacks) → listeners.

mod loader;
#[cfg(test)]
mod tests;

use crate::decode::{Decoder, DecoderSet};
use crate::event::{AssetEvent, AssetEventKind, ListenerHub, ListenerId};
use crate::file_io::{DiskFileSource, FileSource};
use crate::finalize::{Finalizer, PassThroughFinalizer};
use crate::{
    AssetHandle, AssetId, AssetKind, AssetPayload, AssetRegistry, AssetState, ContentKey,
    ContentStore, PipelineSettings, StageRequest,
};
use latch_core::jobs::{MainThreadQueue, TaskScheduler};
use std::path::PathBuf;
use std::sync::Arc;

/// Called on the main thread once a requested asset is `Loaded` or `Failed`.
pub type CompletionCallback = Arc<dyn Fn(&AssetHandle) + Send + Sync + 'static>;

/// Work handed from worker threads to the main thread.
pub(crate) enum MainThreadJob {
    Finalize {
        record: AssetHandle,
        payload: AssetPayload,
        on_complete: Option<CompletionCallback>,
    },
    Complete {
        record: AssetHandle,
        callback: CompletionCallback,
    },
}

pub(crate) struct PipelineShared {
    pub(crate) settings: PipelineSettings,
    pub(crate) registry: AssetRegistry,
    pub(crate) content: ContentStore,
    pub(crate) decoders: DecoderSet,
    pub(crate) files: Arc<dyn FileSource>,
    pub(crate) scheduler: TaskScheduler,
    pub(crate) main_thread: MainThreadQueue<MainThreadJob>,
    pub(crate) listeners: ListenerHub,
}

/// Stages, loads and releases assets.
///
/// Any thread may stage, load, unload or unstage. Exactly one thread (the one
/// that calls [`init`](Self::init)) calls [`on_update`](Self::on_update) once
/// per tick; finalization, completion callbacks and listener notifications
/// all run there.
///
/// Dropping the pipeline shuts it down.
pub struct AssetPipeline {
    shared: Arc<PipelineShared>,
}

impl AssetPipeline {
    /// A pipeline reading files from disk, relative to `settings.asset_root`.
    pub fn new(settings: PipelineSettings) -> Self {
        let files = DiskFileSource::new(settings.asset_root.clone());
        Self::with_file_source(settings, files)
    }

    /// A pipeline reading file-backed assets through `files`.
    pub fn with_file_source(settings: PipelineSettings, files: impl FileSource + 'static) -> Self {
        Self {
            shared: Arc::new(PipelineShared {
                settings,
                registry: AssetRegistry::new(),
                content: ContentStore::new(),
                decoders: DecoderSet::with_defaults(),
                files: Arc::new(files),
                scheduler: TaskScheduler::new(),
                main_thread: MainThreadQueue::new(),
                listeners: ListenerHub::new(),
            }),
        }
    }

    /// Start the worker pool and make the calling thread the main thread.
    ///
    /// Until `init` runs, loads decode synchronously on the calling thread.
    pub fn init(&self) {
        let shared = &self.shared;
        if !shared.main_thread.bind_current_thread() || !shared.listeners.bind_current_thread() {
            tracing::warn!("asset pipeline initialized from a thread other than its main thread");
        }
        shared.scheduler.init(shared.settings.worker_threads);
        tracing::info!(
            "asset pipeline ready ({} workers)",
            shared.scheduler.thread_count()
        );
    }

    /// Stop the workers and drop queued work, listeners and notifications.
    ///
    /// Decodes that never started are discarded and their records stay
    /// `Loading`. Staged records are kept.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        shared.scheduler.shutdown();
        let dropped_jobs = shared.main_thread.clear();
        if dropped_jobs > 0 {
            tracing::warn!("dropped {} main-thread jobs at shutdown", dropped_jobs);
        }
        shared.listeners.clear();
        tracing::info!("asset pipeline shut down");
    }

    /// Drain both main-thread queues, installing payloads unchanged.
    pub fn on_update(&self) -> usize {
        self.on_update_with(&mut PassThroughFinalizer)
    }

    /// Drain both main-thread queues, finalizing payloads with `finalizer`.
    /// Returns how many jobs and notifications ran.
    pub fn on_update_with(&self, finalizer: &mut dyn Finalizer) -> usize {
        let shared = &self.shared;
        let jobs = shared
            .main_thread
            .drain_with(|job| shared.run_main_thread_job(job, &mut *finalizer));
        jobs + shared.listeners.dispatch()
    }

    /// Register an asset, or return the live record describing the same
    /// content. Emits `Staged` for new records only.
    pub fn stage(&self, request: StageRequest) -> Option<AssetHandle> {
        let outcome = self.shared.registry.stage(request)?;
        if outcome.is_created() {
            self.shared
                .listeners
                .notify(AssetEvent::from_record(AssetEventKind::Staged, outcome.handle()));
        }
        Some(outcome.into_handle())
    }

    pub fn stage_file(
        &self,
        kind: AssetKind,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Option<AssetHandle> {
        self.stage(StageRequest::file(kind, name, path))
    }

    pub fn stage_memory(
        &self,
        kind: AssetKind,
        name: impl Into<String>,
        key: ContentKey,
    ) -> Option<AssetHandle> {
        self.stage(StageRequest::memory(kind, name, key))
    }

    pub fn stage_composite(
        &self,
        kind: AssetKind,
        name: impl Into<String>,
        dependencies: Vec<AssetId>,
    ) -> Option<AssetHandle> {
        self.stage(StageRequest::composite(kind, name, dependencies))
    }

    /// Start loading every `Staged` record in `ids`, dependencies first.
    /// Records in any other state are skipped.
    pub fn load(&self, ids: &[AssetId]) {
        self.shared.load_request(Arc::from(ids), None, &[]);
    }

    /// Like [`load`](Self::load), then call `on_complete` on the main thread
    /// for each record this call moved to `Loaded` or `Failed`.
    pub fn load_with<F>(&self, ids: &[AssetId], on_complete: F)
    where
        F: Fn(&AssetHandle) + Send + Sync + 'static,
    {
        self.shared
            .load_request(Arc::from(ids), Some(Arc::new(on_complete)), &[]);
    }

    /// Drop a settled record's payload and return it to `Staged`.
    pub fn unload(&self, id: AssetId) -> bool {
        self.shared.unload(id)
    }

    /// Remove a record from the registry.
    pub fn unstage(&self, id: AssetId) -> bool {
        self.shared.unstage(id)
    }

    pub fn get(&self, id: AssetId) -> Option<AssetHandle> {
        self.shared.registry.get(id)
    }

    pub fn find(&self, name: &str) -> Option<AssetHandle> {
        self.shared.registry.find(name)
    }

    /// Current state, `None` for ids that are not registered.
    pub fn state(&self, id: AssetId) -> AssetState {
        self.get(id)
            .map_or(AssetState::None, |record| record.state())
    }

    pub fn payload(&self, id: AssetId) -> Option<Arc<AssetPayload>> {
        self.get(id).and_then(|record| record.payload())
    }

    /// Every staged record, ordered by id.
    pub fn records(&self) -> Vec<AssetHandle> {
        self.shared.registry.records()
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.shared.registry
    }

    pub fn content(&self) -> &ContentStore {
        &self.shared.content
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.shared.settings
    }

    pub fn register_data(&self, bytes: Vec<u8>) -> ContentKey {
        self.shared.content.register(bytes)
    }

    pub fn register_slice(&self, bytes: &[u8]) -> ContentKey {
        self.shared.content.register_slice(bytes)
    }

    pub fn unregister_data(&self, key: ContentKey) -> bool {
        self.shared.content.unregister(key)
    }

    pub fn content_data(&self, key: ContentKey) -> Arc<[u8]> {
        self.shared.content.get(key)
    }

    /// Listen to the asset currently named `name`.
    pub fn add_listener<F>(&self, name: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&AssetEvent) + Send + Sync + 'static,
    {
        self.shared.listeners.add_scoped(name, listener)
    }

    pub fn add_global_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AssetEvent) + Send + Sync + 'static,
    {
        self.shared.listeners.add_global(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    /// Replace the decoder used for `kind`.
    pub fn register_decoder(&self, kind: AssetKind, decoder: impl Decoder + 'static) {
        self.shared.decoders.register(kind, decoder);
    }
}

impl Drop for AssetPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
