use super::*;
use crate::decode::{encode_png, DecodeInput};
use crate::event::AssetEventKind;
use crate::payload::GpuHandle;
use crate::{AssetError, AssetRecord};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const VERTEX: &str = "void main() { gl_Position = vec4(0.0); }";
const FRAGMENT: &str = "void main() { color = vec4(1.0); }";

/// File source backed by a fixed map, for tests that must not touch disk.
#[derive(Default)]
struct MemoryFiles(HashMap<PathBuf, Vec<u8>>);

impl MemoryFiles {
    fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.0.insert(PathBuf::from(path), bytes);
        self
    }
}

impl FileSource for MemoryFiles {
    fn load_file(&self, path: &Path) -> Vec<u8> {
        self.0.get(path).cloned().unwrap_or_default()
    }
}

/// Holds every read until the test releases it.
struct GatedFiles {
    bytes: Vec<u8>,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl FileSource for GatedFiles {
    fn load_file(&self, _path: &Path) -> Vec<u8> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        self.bytes.clone()
    }
}

fn pipeline() -> AssetPipeline {
    AssetPipeline::with_file_source(PipelineSettings::default(), MemoryFiles::default())
}

fn pipeline_with_files(files: MemoryFiles) -> AssetPipeline {
    AssetPipeline::with_file_source(PipelineSettings::default(), files)
}

fn stage_bytes(pipeline: &AssetPipeline, kind: AssetKind, name: &str, bytes: &[u8]) -> AssetId {
    let key = pipeline.register_slice(bytes);
    pipeline.stage_memory(kind, name, key).unwrap().id()
}

type EventLog = Arc<Mutex<Vec<(AssetEventKind, String)>>>;

fn record_events(pipeline: &AssetPipeline) -> EventLog {
    let log: EventLog = Arc::default();
    let sink = Arc::clone(&log);
    pipeline.add_global_listener(move |event| {
        sink.lock().unwrap().push((event.kind, event.name.clone()));
    });
    log
}

fn counting_raw_decoder(pipeline: &AssetPipeline) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    pipeline.register_decoder(
        AssetKind::Raw,
        move |input: DecodeInput<'_>| -> Result<AssetPayload, AssetError> {
            seen.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            Ok(AssetPayload::Raw(Arc::from(input.require_bytes()?)))
        },
    );
    count
}

/// Run main-thread ticks until `done` holds, then one more to flush listeners.
fn pump_with(pipeline: &AssetPipeline, finalizer: &mut dyn Finalizer, done: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for the pipeline");
        pipeline.on_update_with(&mut *finalizer);
        thread::sleep(Duration::from_millis(1));
    }
    pipeline.on_update_with(finalizer);
}

fn pump(pipeline: &AssetPipeline, done: impl Fn() -> bool) {
    pump_with(pipeline, &mut PassThroughFinalizer, done);
}

fn settled(pipeline: &AssetPipeline, id: AssetId) -> bool {
    pipeline.state(id).is_settled()
}

#[test]
fn staging_the_same_file_twice_returns_one_record() {
    let pipeline = pipeline();
    let events = record_events(&pipeline);

    let first = pipeline
        .stage_file(AssetKind::Texture2D, "brick", "textures/brick.png")
        .unwrap();
    let second = pipeline
        .stage_file(AssetKind::Texture2D, "brick", "textures/brick.png")
        .unwrap();
    pipeline.on_update();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(pipeline.records().len(), 1);
    assert_eq!(
        *events.lock().unwrap(),
        vec![(AssetEventKind::Staged, "brick".to_string())]
    );
}

#[test]
fn different_files_with_one_name_get_unique_names() {
    let pipeline = pipeline();
    let a = pipeline.stage_file(AssetKind::Raw, "brick", "a.bin").unwrap();
    let b = pipeline.stage_file(AssetKind::Raw, "brick", "b.bin").unwrap();

    assert_eq!(a.name(), "brick");
    assert_eq!(b.name(), "brick_1");
    assert_eq!(pipeline.find("brick_1").unwrap().id(), b.id());
}

#[test]
fn listeners_see_each_transition_in_order() {
    let pipeline = pipeline();
    let events = record_events(&pipeline);

    let id = stage_bytes(&pipeline, AssetKind::Raw, "blob", b"payload");
    pipeline.load(&[id]);
    assert!(events.lock().unwrap().is_empty());

    pipeline.on_update();
    let kinds: Vec<_> = events.lock().unwrap().iter().map(|(kind, _)| *kind).collect();
    assert_eq!(
        kinds,
        vec![
            AssetEventKind::Staged,
            AssetEventKind::Loading,
            AssetEventKind::Loaded
        ]
    );
    assert_eq!(
        pipeline.payload(id).unwrap().as_bytes(),
        Some(&b"payload"[..])
    );
}

#[test]
fn scoped_listeners_only_hear_their_asset() {
    let pipeline = pipeline();
    let heard = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&heard);
    pipeline.add_listener("wanted", move |event| {
        assert_eq!(event.name, "wanted");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let wanted = stage_bytes(&pipeline, AssetKind::Raw, "wanted", b"a");
    let other = stage_bytes(&pipeline, AssetKind::Raw, "other", b"b");
    pipeline.load(&[wanted, other]);
    pipeline.on_update();

    assert_eq!(heard.load(Ordering::SeqCst), 3);
}

#[test]
fn staged_texture_reports_staged_loading_loaded() {
    let png = encode_png(2, 2, [0, 255, 0, 255]);
    let pipeline = pipeline_with_files(MemoryFiles::default().with("a.png", png));
    let events: Arc<Mutex<Vec<(AssetEventKind, AssetId, AssetState)>>> = Arc::default();
    let sink = Arc::clone(&events);
    pipeline.add_global_listener(move |event| {
        sink.lock().unwrap().push((event.kind, event.id, event.state));
    });
    pipeline.init();

    let record = pipeline
        .stage_file(AssetKind::Texture2D, "a", "a.png")
        .unwrap();
    let id = record.id();
    assert_eq!(id.get(), 1);
    assert_eq!(record.state(), AssetState::Staged);

    pipeline.load(&[id]);
    // Decoding may already be done, but the texture still waits for the
    // main thread to finalize it.
    assert_eq!(record.state(), AssetState::Loading);

    pump(&pipeline, || settled(&pipeline, id));
    assert_eq!(record.state(), AssetState::Loaded);
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            (AssetEventKind::Staged, id, AssetState::Staged),
            (AssetEventKind::Loading, id, AssetState::Loading),
            (AssetEventKind::Loaded, id, AssetState::Loaded),
        ]
    );
}

#[test]
fn meshes_load_from_obj_text() {
    let pipeline = pipeline();
    let obj = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let id = stage_bytes(&pipeline, AssetKind::Mesh, "triangle", obj);

    pipeline.load(&[id]);
    pump(&pipeline, || settled(&pipeline, id));

    assert_eq!(pipeline.state(id), AssetState::Loaded);
    let payload = pipeline.payload(id).unwrap();
    let mesh = payload.as_mesh().unwrap();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.triangle_count(), 1);
}

#[test]
fn textures_are_finalized_on_the_main_thread() {
    let png = encode_png(4, 4, [255, 0, 0, 255]);
    let pipeline = pipeline_with_files(MemoryFiles::default().with("brick.png", png));
    pipeline.init();

    let main = thread::current().id();
    let finalized = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&finalized);
    let mut finalizer =
        move |_record: &AssetRecord, mut payload: AssetPayload| -> Result<AssetPayload, AssetError> {
            assert_eq!(thread::current().id(), main);
            calls.fetch_add(1, Ordering::SeqCst);
            payload.set_gpu_handle(GpuHandle(7));
            Ok(payload)
        };

    let id = pipeline
        .stage_file(AssetKind::Texture2D, "brick", "brick.png")
        .unwrap()
        .id();
    pipeline.load(&[id]);
    pump_with(&pipeline, &mut finalizer, || settled(&pipeline, id));

    assert_eq!(pipeline.state(id), AssetState::Loaded);
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
    let payload = pipeline.payload(id).unwrap();
    let texture = payload.as_texture().unwrap();
    assert_eq!((texture.width, texture.height), (4, 4));
    assert_eq!(texture.gpu, Some(GpuHandle(7)));
}

#[test]
fn missing_files_fail_the_load() {
    let pipeline = pipeline();
    let record = pipeline
        .stage_file(AssetKind::Raw, "ghost", "nowhere.bin")
        .unwrap();
    pipeline.load(&[record.id()]);

    assert_eq!(record.state(), AssetState::Failed);
    assert!(record.message().unwrap().contains("nowhere.bin"));
    assert!(!record.has_payload());
}

#[test]
fn disk_files_resolve_against_the_asset_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.bin"), b"hello").unwrap();
    let settings = PipelineSettings {
        asset_root: Some(dir.path().to_path_buf()),
        ..PipelineSettings::default()
    };
    let pipeline = AssetPipeline::new(settings);

    let id = pipeline
        .stage_file(AssetKind::Raw, "hello", "hello.bin")
        .unwrap()
        .id();
    pipeline.load(&[id]);

    assert_eq!(pipeline.state(id), AssetState::Loaded);
    assert_eq!(pipeline.payload(id).unwrap().as_bytes(), Some(&b"hello"[..]));
    // The file read lands in the content store and is owned by the record.
    assert_eq!(pipeline.content().len(), 1);
}

#[test]
fn dependencies_load_before_their_dependents() {
    let pipeline = pipeline();
    let events = record_events(&pipeline);

    let vertex = stage_bytes(&pipeline, AssetKind::VertexShader, "basic.vert", VERTEX.as_bytes());
    let fragment = stage_bytes(
        &pipeline,
        AssetKind::FragmentShader,
        "basic.frag",
        FRAGMENT.as_bytes(),
    );
    let program = pipeline
        .stage_composite(AssetKind::ShaderProgram, "basic", vec![vertex, fragment])
        .unwrap()
        .id();

    pipeline.load(&[program]);
    pump(&pipeline, || settled(&pipeline, program));

    assert_eq!(pipeline.state(vertex), AssetState::Loaded);
    assert_eq!(pipeline.state(fragment), AssetState::Loaded);
    assert_eq!(pipeline.state(program), AssetState::Loaded);

    let payload = pipeline.payload(program).unwrap();
    let linked = payload.as_shader_program().unwrap();
    assert_eq!(linked.vertex_source, VERTEX);
    assert_eq!(linked.fragment_source, FRAGMENT);

    let loaded: Vec<String> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|(kind, _)| *kind == AssetEventKind::Loaded)
        .map(|(_, name)| name.clone())
        .collect();
    assert_eq!(loaded.last().map(String::as_str), Some("basic"));
    assert_eq!(loaded.len(), 3);
}

#[test]
fn failed_dependencies_fail_their_dependents() {
    let pipeline = pipeline();
    let events = record_events(&pipeline);

    let vertex = stage_bytes(&pipeline, AssetKind::VertexShader, "blank.vert", b"   ");
    let fragment = stage_bytes(
        &pipeline,
        AssetKind::FragmentShader,
        "basic.frag",
        FRAGMENT.as_bytes(),
    );
    let program = pipeline
        .stage_composite(AssetKind::ShaderProgram, "broken", vec![vertex, fragment])
        .unwrap()
        .id();

    pipeline.load(&[program]);
    pump(&pipeline, || settled(&pipeline, program));

    assert_eq!(pipeline.state(vertex), AssetState::Failed);
    assert_eq!(pipeline.state(program), AssetState::Failed);
    let message = pipeline.get(program).unwrap().message().unwrap();
    assert!(message.contains("blank.vert"), "{message}");

    let program_events: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, name)| name == "broken")
        .map(|(kind, _)| *kind)
        .collect();
    assert_eq!(
        program_events,
        vec![AssetEventKind::Staged, AssetEventKind::Failed]
    );
}

fn depth_limited(max_dependency_depth: usize) -> AssetPipeline {
    let settings = PipelineSettings {
        max_dependency_depth,
        ..PipelineSettings::default()
    };
    AssetPipeline::with_file_source(settings, MemoryFiles::default())
}

/// Stage a program composed from freshly staged vertex and fragment stages.
fn stage_program(pipeline: &AssetPipeline, name: &str) -> (AssetId, AssetId, AssetId) {
    let vertex = stage_bytes(pipeline, AssetKind::VertexShader, "basic.vert", VERTEX.as_bytes());
    let fragment = stage_bytes(
        pipeline,
        AssetKind::FragmentShader,
        "basic.frag",
        FRAGMENT.as_bytes(),
    );
    let program = pipeline
        .stage_composite(AssetKind::ShaderProgram, name, vec![vertex, fragment])
        .unwrap()
        .id();
    (vertex, fragment, program)
}

#[test]
fn depth_zero_still_loads_leaves() {
    let pipeline = depth_limited(0);
    let leaf = stage_bytes(&pipeline, AssetKind::Raw, "leaf", b"leaf");
    let (vertex, _, program) = stage_program(&pipeline, "basic");

    pipeline.load(&[leaf, program]);
    pump(&pipeline, || settled(&pipeline, program));

    assert_eq!(pipeline.state(leaf), AssetState::Loaded);
    assert_eq!(pipeline.state(program), AssetState::Failed);
    let message = pipeline.get(vertex).unwrap().message().unwrap();
    assert!(message.contains("deeper than 0"), "{message}");
}

#[test]
fn depth_one_allows_direct_dependencies() {
    let pipeline = depth_limited(1);
    let (vertex, fragment, program) = stage_program(&pipeline, "basic");

    pipeline.load(&[program]);
    pump(&pipeline, || settled(&pipeline, program));

    assert_eq!(pipeline.state(vertex), AssetState::Loaded);
    assert_eq!(pipeline.state(fragment), AssetState::Loaded);
    assert_eq!(pipeline.state(program), AssetState::Loaded);
}

#[test]
fn chains_past_the_limit_are_cut_off() {
    let pipeline = depth_limited(1);
    let leaf = stage_bytes(&pipeline, AssetKind::Raw, "leaf", b"leaf");
    let middle = pipeline
        .stage_composite(AssetKind::Raw, "middle", vec![leaf])
        .unwrap()
        .id();
    let top = pipeline
        .stage_composite(AssetKind::Raw, "top", vec![middle])
        .unwrap()
        .id();

    pipeline.load(&[top]);
    pump(&pipeline, || settled(&pipeline, top));

    assert_eq!(pipeline.state(leaf), AssetState::Failed);
    let message = pipeline.get(leaf).unwrap().message().unwrap();
    assert!(message.contains("deeper than 1"), "{message}");
    assert_eq!(pipeline.state(middle), AssetState::Failed);
    assert_eq!(pipeline.state(top), AssetState::Failed);
}

#[test]
fn records_on_their_own_chain_fail_as_cycles() {
    let pipeline = pipeline();
    let id = stage_bytes(&pipeline, AssetKind::Raw, "loop", b"loop");

    pipeline.shared.load_request(Arc::from(vec![id]), None, &[id]);

    assert_eq!(pipeline.state(id), AssetState::Failed);
    let message = pipeline.get(id).unwrap().message().unwrap();
    assert!(message.contains("depends on itself"), "{message}");
}

#[test]
fn concurrent_loads_decode_once() {
    let settings = PipelineSettings {
        worker_threads: 4,
        ..PipelineSettings::default()
    };
    let pipeline = AssetPipeline::with_file_source(settings, MemoryFiles::default());
    pipeline.init();
    let decodes = counting_raw_decoder(&pipeline);
    let id = stage_bytes(&pipeline, AssetKind::Raw, "shared", b"shared");

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| pipeline.load(&[id]));
        }
    });
    pump(&pipeline, || settled(&pipeline, id));

    assert_eq!(pipeline.state(id), AssetState::Loaded);
    assert_eq!(decodes.load(Ordering::SeqCst), 1);
    pipeline.shutdown();
}

#[test]
fn loading_a_loaded_asset_does_nothing() {
    let pipeline = pipeline();
    let decodes = counting_raw_decoder(&pipeline);
    let id = stage_bytes(&pipeline, AssetKind::Raw, "once", b"once");

    pipeline.load(&[id]);
    pipeline.load(&[id]);

    assert_eq!(decodes.load(Ordering::SeqCst), 1);
}

#[test]
fn unload_then_load_decodes_again() {
    let pipeline = pipeline();
    let events = record_events(&pipeline);
    let decodes = counting_raw_decoder(&pipeline);
    let id = stage_bytes(&pipeline, AssetKind::Raw, "cycle", b"cycle");

    pipeline.load(&[id]);
    assert!(pipeline.unload(id));
    assert_eq!(pipeline.state(id), AssetState::Staged);
    assert!(pipeline.payload(id).is_none());
    assert!(!pipeline.unload(id));

    pipeline.load(&[id]);
    pipeline.on_update();

    assert_eq!(pipeline.state(id), AssetState::Loaded);
    assert_eq!(decodes.load(Ordering::SeqCst), 2);
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|(kind, _)| *kind == AssetEventKind::Unloaded));
}

#[test]
fn unload_is_refused_while_loading() {
    let png = encode_png(1, 1, [0, 0, 0, 255]);
    let pipeline = pipeline();
    let id = stage_bytes(&pipeline, AssetKind::Texture2D, "pending", &png);

    // Without a tick the decoded texture waits for finalization.
    pipeline.load(&[id]);
    assert_eq!(pipeline.state(id), AssetState::Loading);
    assert!(!pipeline.unload(id));

    pipeline.on_update();
    assert_eq!(pipeline.state(id), AssetState::Loaded);
}

#[test]
fn decoder_panics_fail_the_asset() {
    let pipeline = pipeline();
    pipeline.register_decoder(
        AssetKind::Raw,
        |_input: DecodeInput<'_>| -> Result<AssetPayload, AssetError> {
            panic!("corrupt header")
        },
    );
    let id = stage_bytes(&pipeline, AssetKind::Raw, "corrupt", b"??");

    pipeline.load(&[id]);

    assert_eq!(pipeline.state(id), AssetState::Failed);
    let message = pipeline.get(id).unwrap().message().unwrap();
    assert!(message.contains("corrupt header"), "{message}");
}

#[test]
fn finalizer_errors_fail_the_asset() {
    let pipeline = pipeline();
    let id = stage_bytes(&pipeline, AssetKind::VertexShader, "bad.vert", VERTEX.as_bytes());
    let mut finalizer =
        |record: &AssetRecord, _payload: AssetPayload| -> Result<AssetPayload, AssetError> {
            Err(AssetError::Finalize {
                name: record.name(),
                message: "compile error".into(),
            })
        };

    pipeline.load(&[id]);
    pump_with(&pipeline, &mut finalizer, || settled(&pipeline, id));

    assert_eq!(pipeline.state(id), AssetState::Failed);
    assert!(pipeline
        .get(id)
        .unwrap()
        .message()
        .unwrap()
        .contains("compile error"));
}

#[test]
fn completion_callbacks_run_on_the_next_tick() {
    let pipeline = pipeline();
    let completed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completed);

    let good = stage_bytes(&pipeline, AssetKind::Raw, "good", b"good");
    let bad = pipeline
        .stage_file(AssetKind::Raw, "bad", "missing.bin")
        .unwrap()
        .id();
    pipeline.load_with(&[good, bad], move |record| {
        sink.lock().unwrap().push((record.id(), record.state()));
    });
    assert!(completed.lock().unwrap().is_empty());

    pipeline.on_update();
    let mut completed = completed.lock().unwrap().clone();
    completed.sort_by_key(|(id, _)| id.get());
    assert_eq!(
        completed,
        vec![(good, AssetState::Loaded), (bad, AssetState::Failed)]
    );
}

#[test]
fn unstage_removes_the_record_and_its_file_bytes() {
    let pipeline = pipeline_with_files(MemoryFiles::default().with("level.bin", b"level".to_vec()));
    let events = record_events(&pipeline);
    let record = pipeline
        .stage_file(AssetKind::Raw, "level", "level.bin")
        .unwrap();
    let id = record.id();
    pipeline.load(&[id]);
    assert_eq!(pipeline.content().len(), 1);

    assert!(pipeline.unstage(id));
    pipeline.on_update();

    assert!(pipeline.get(id).is_none());
    assert!(pipeline.find("level").is_none());
    assert_eq!(pipeline.state(id), AssetState::None);
    assert_eq!(record.state(), AssetState::None);
    assert!(pipeline.content().is_empty());
    assert_eq!(
        events.lock().unwrap().last(),
        Some(&(AssetEventKind::Unstaged, "level".to_string()))
    );
    assert!(!pipeline.unstage(id));
}

#[test]
fn unstaging_during_a_file_read_releases_the_bytes() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let files = GatedFiles {
        bytes: b"level".to_vec(),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let settings = PipelineSettings {
        worker_threads: 1,
        ..PipelineSettings::default()
    };
    let pipeline = AssetPipeline::with_file_source(settings, files);
    pipeline.init();

    let id = pipeline
        .stage_file(AssetKind::Raw, "level", "level.bin")
        .unwrap()
        .id();
    pipeline.load(&[id]);
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    assert!(pipeline.unstage(id));
    release_tx.send(()).unwrap();
    // Joining the workers lets the in-flight read finish first.
    pipeline.shutdown();
    pipeline.on_update();

    assert!(pipeline.records().is_empty());
    assert!(pipeline.content().is_empty());
}

#[test]
fn unstaging_a_pending_dependency_fails_its_dependents() {
    let pipeline = pipeline();
    let vertex = stage_bytes(&pipeline, AssetKind::VertexShader, "basic.vert", VERTEX.as_bytes());
    let fragment = stage_bytes(
        &pipeline,
        AssetKind::FragmentShader,
        "basic.frag",
        FRAGMENT.as_bytes(),
    );
    let program = pipeline
        .stage_composite(AssetKind::ShaderProgram, "basic", vec![vertex, fragment])
        .unwrap()
        .id();

    pipeline.load(&[program]);
    assert_eq!(pipeline.state(vertex), AssetState::Loading);

    assert!(pipeline.unstage(vertex));
    pump(&pipeline, || settled(&pipeline, program));

    assert_eq!(pipeline.state(program), AssetState::Failed);
    assert_eq!(pipeline.state(fragment), AssetState::Loaded);
}

#[test]
fn unknown_ids_are_ignored() {
    let pipeline = pipeline();
    let id = stage_bytes(&pipeline, AssetKind::Raw, "real", b"real");
    assert!(pipeline.unstage(id));

    pipeline.load(&[id]);
    assert!(!pipeline.unload(id));
    assert_eq!(pipeline.state(id), AssetState::None);
}

#[test]
fn shutdown_drops_listeners_but_keeps_records() {
    let pipeline = pipeline();
    pipeline.init();
    let events = record_events(&pipeline);
    let id = stage_bytes(&pipeline, AssetKind::Raw, "kept", b"kept");

    pipeline.shutdown();
    pipeline.on_update();

    assert!(events.lock().unwrap().is_empty());
    assert_eq!(pipeline.state(id), AssetState::Staged);

    // After shutdown, loads run on the calling thread.
    pipeline.load(&[id]);
    assert_eq!(pipeline.state(id), AssetState::Loaded);
}
