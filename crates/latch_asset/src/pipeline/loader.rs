//! Load orchestration: dependency resolution, worker decodes and completion.

use super::{CompletionCallback, MainThreadJob, PipelineShared};
use crate::decode::DecodeInput;
use crate::event::{AssetEvent, AssetEventKind};
use crate::record::Waiter;
use crate::{AssetError, AssetHandle, AssetId, AssetPayload, AssetRecord, AssetState};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// Where a record stands with respect to its dependencies.
enum Readiness {
    /// Every dependency is loaded.
    Ready,
    /// A continuation is parked on a dependency that is still in flight.
    Waiting,
    Blocked(AssetError),
}

impl PipelineShared {
    /// Load every `Staged` record in `request`.
    ///
    /// `chain` lists the records whose dependencies are being resolved above
    /// this call. A record that is already on it, or one nested more than
    /// `max_dependency_depth` levels below the request, fails instead of
    /// recursing.
    pub(crate) fn load_request(
        self: &Arc<Self>,
        request: Arc<[AssetId]>,
        on_complete: Option<CompletionCallback>,
        chain: &[AssetId],
    ) {
        for &id in request.iter() {
            let Some(record) = self.registry.get(id) else {
                tracing::warn!("load requested for unknown {}", id);
                continue;
            };
            if record.state() != AssetState::Staged {
                tracing::trace!("skipping {} '{}': {}", id, record.name(), record.state());
                continue;
            }

            let limit = self.settings.max_dependency_depth;
            if chain.contains(&id) {
                self.fail_before_loading(
                    record,
                    AssetError::DependencyCycle { id },
                    on_complete.clone(),
                );
                continue;
            }
            if chain.len() > limit {
                self.fail_before_loading(
                    record,
                    AssetError::DependencyTooDeep { id, limit },
                    on_complete.clone(),
                );
                continue;
            }

            match self.resolve_dependencies(&record, &request, &on_complete, chain) {
                Readiness::Ready => self.dispatch(record, on_complete.clone()),
                Readiness::Waiting => {}
                Readiness::Blocked(err) => {
                    self.fail_before_loading(record, err, on_complete.clone())
                }
            }
        }
    }

    fn resolve_dependencies(
        self: &Arc<Self>,
        record: &AssetRecord,
        request: &Arc<[AssetId]>,
        on_complete: &Option<CompletionCallback>,
        chain: &[AssetId],
    ) -> Readiness {
        let mut pending = Vec::new();
        for id in record.dependencies() {
            let Some(dependency) = self.registry.get(id) else {
                return Readiness::Blocked(AssetError::DependencyMissing { id });
            };
            match dependency.state() {
                AssetState::Loaded => {}
                AssetState::Failed => {
                    return Readiness::Blocked(AssetError::DependencyFailed {
                        id,
                        name: dependency.name(),
                    })
                }
                AssetState::None => return Readiness::Blocked(AssetError::DependencyMissing { id }),
                AssetState::Staged | AssetState::Loading => pending.push(dependency),
            }
        }

        let Some(first) = pending.first() else {
            return Readiness::Ready;
        };

        // Park before kicking the dependencies so a load that finishes right
        // away still finds the continuation.
        let waiter = self.continuation(Arc::clone(request), on_complete.clone(), chain);
        if let Err((waiter, state)) = first.wait_until_settled(waiter) {
            waiter(state);
        }

        let staged: Vec<AssetId> = pending
            .iter()
            .filter(|dependency| dependency.state() == AssetState::Staged)
            .map(|dependency| dependency.id())
            .collect();
        if !staged.is_empty() {
            let mut nested = chain.to_vec();
            nested.push(record.id());
            self.load_request(Arc::from(staged), None, &nested);
        }
        Readiness::Waiting
    }

    /// Re-run `request` on a worker once the parked-on record settles.
    fn continuation(
        self: &Arc<Self>,
        request: Arc<[AssetId]>,
        on_complete: Option<CompletionCallback>,
        chain: &[AssetId],
    ) -> Waiter {
        // Records own their waiters, so holding the pipeline strongly here
        // would keep it alive through its own registry.
        let shared: Weak<Self> = Arc::downgrade(self);
        let chain = chain.to_vec();
        Box::new(move |_state| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let worker = Arc::clone(&shared);
            shared
                .scheduler
                .submit(move || worker.load_request(request, on_complete, &chain));
        })
    }

    fn dispatch(self: &Arc<Self>, record: AssetHandle, on_complete: Option<CompletionCallback>) {
        if !record.try_begin_loading() {
            return;
        }
        tracing::debug!("loading {} '{}'", record.id(), record.name());
        self.listeners
            .notify(AssetEvent::from_record(AssetEventKind::Loading, &record));

        let worker = Arc::clone(self);
        self.scheduler
            .submit(move || worker.decode_on_worker(record, on_complete));
    }

    fn fail_before_loading(
        &self,
        record: AssetHandle,
        err: AssetError,
        on_complete: Option<CompletionCallback>,
    ) {
        tracing::error!("{} '{}' cannot load: {}", record.id(), record.name(), err);
        let Some(settled) = record.fail_staged(err.to_string()) else {
            return;
        };
        self.listeners
            .notify(AssetEvent::from_info(AssetEventKind::Failed, settled.info));
        wake(settled.waiters, AssetState::Failed);
        if let Some(callback) = on_complete {
            self.main_thread.push(MainThreadJob::Complete { record, callback });
        }
    }

    fn decode_on_worker(self: &Arc<Self>, record: AssetHandle, on_complete: Option<CompletionCallback>) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.decode_record(&record)))
            .unwrap_or_else(|panic| {
                Err(AssetError::Panicked {
                    stage: "decoding",
                    name: record.name(),
                    message: panic_message(panic),
                })
            });

        match result {
            Ok(payload) if record.kind().requires_finalization() => {
                self.main_thread.push(MainThreadJob::Finalize {
                    record,
                    payload,
                    on_complete,
                });
            }
            result => self.complete(record, result, on_complete),
        }
    }

    fn decode_record(&self, record: &AssetRecord) -> Result<AssetPayload, AssetError> {
        let bytes = if let Some(path) = record.path() {
            let data = self.files.load_file(&path);
            if data.is_empty() {
                return Err(AssetError::FileRead { path });
            }
            let key = self.content.register(data);
            match record.replace_owned_content(key) {
                Ok(Some(previous)) => {
                    self.content.unregister(previous);
                }
                Ok(None) => {}
                Err(key) => {
                    self.content.unregister(key);
                    return Err(AssetError::Unstaged {
                        name: record.name(),
                    });
                }
            }
            Some(self.content.get(key))
        } else if let Some(key) = record.content_key() {
            let data = self.content.get(key);
            if data.is_empty() {
                return Err(AssetError::MissingContent { key });
            }
            Some(data)
        } else {
            None
        };

        let dependencies = record
            .dependencies()
            .into_iter()
            .map(|id| {
                self.registry
                    .get(id)
                    .and_then(|dependency| dependency.payload())
                    .ok_or(AssetError::DependencyUnavailable { id })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let name = record.name();
        self.decoders.decode(DecodeInput {
            kind: record.kind(),
            name: &name,
            bytes: bytes.as_deref(),
            dependencies: &dependencies,
        })
    }

    /// Settle a `Loading` record and fan the result out.
    pub(super) fn complete(
        &self,
        record: AssetHandle,
        result: Result<AssetPayload, AssetError>,
        on_complete: Option<CompletionCallback>,
    ) {
        let result = result.map_err(|err| {
            tracing::error!("{} '{}' failed to load: {}", record.id(), record.name(), err);
            err.to_string()
        });

        let Some(settled) = record.finish_loading(result) else {
            tracing::warn!(
                "{} '{}' left the loading state before it finished; result dropped",
                record.id(),
                record.name()
            );
            if let Some(key) = record.take_owned_content() {
                self.content.unregister(key);
            }
            return;
        };

        let state = settled.info.state;
        let kind = if state == AssetState::Loaded {
            tracing::debug!("loaded {} '{}'", record.id(), settled.info.name);
            AssetEventKind::Loaded
        } else {
            AssetEventKind::Failed
        };
        self.listeners
            .notify(AssetEvent::from_info(kind, settled.info));
        wake(settled.waiters, state);

        if let Some(callback) = on_complete {
            self.main_thread.push(MainThreadJob::Complete { record, callback });
        }
    }

    pub(super) fn run_main_thread_job(
        &self,
        job: MainThreadJob,
        finalizer: &mut dyn crate::finalize::Finalizer,
    ) {
        match job {
            MainThreadJob::Finalize {
                record,
                payload,
                on_complete,
            } => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    finalizer.finalize(&record, payload)
                }))
                .unwrap_or_else(|panic| {
                    Err(AssetError::Panicked {
                        stage: "finalizing",
                        name: record.name(),
                        message: panic_message(panic),
                    })
                });
                self.complete(record, result, on_complete);
            }
            MainThreadJob::Complete { record, callback } => callback(&record),
        }
    }

    pub(super) fn unload(&self, id: AssetId) -> bool {
        let Some(record) = self.registry.get(id) else {
            tracing::warn!("unload requested for unknown {}", id);
            return false;
        };
        match record.unload() {
            Ok(owned) => {
                if let Some(key) = owned {
                    self.content.unregister(key);
                }
                tracing::debug!("unloaded {} '{}'", id, record.name());
                self.listeners
                    .notify(AssetEvent::from_record(AssetEventKind::Unloaded, &record));
                true
            }
            Err(AssetState::Staged) => false,
            Err(state) => {
                tracing::warn!("cannot unload {} '{}' while {}", id, record.name(), state);
                false
            }
        }
    }

    pub(super) fn unstage(&self, id: AssetId) -> bool {
        let Some(record) = self.registry.remove(id) else {
            tracing::warn!("unstage requested for unknown {}", id);
            return false;
        };

        let mut event = AssetEvent::from_record(AssetEventKind::Unstaged, &record);
        let cleared = record.clear();
        event.state = AssetState::None;

        if cleared.had_payload {
            tracing::warn!("unstaging {} '{}' while its payload is loaded", id, event.name);
        }
        if let Some(key) = cleared.owned_content {
            self.content.unregister(key);
        }
        if !cleared.waiters.is_empty() {
            tracing::warn!(
                "{} loads were waiting on {} '{}'",
                cleared.waiters.len(),
                id,
                event.name
            );
            wake(cleared.waiters, AssetState::None);
        }
        let holders = Arc::strong_count(&record) - 1;
        if holders > 0 {
            tracing::warn!("{} '{}' is still held by {} handles", id, event.name, holders);
        }

        self.listeners.notify(event);
        true
    }
}

fn wake(waiters: Vec<Waiter>, state: AssetState) {
    for waiter in waiters {
        waiter(state);
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
