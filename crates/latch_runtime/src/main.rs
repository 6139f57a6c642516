//! Latch Engine Runtime
//!
//! Boots the asset pipeline, loads the assets named on the command line and
//! reports what became of them.

use anyhow::{Context, Result};
use clap::Parser;
use latch_asset::{AssetKind, AssetPayload, AssetPipeline, AssetState, PipelineSettings};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(16);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "latch", about = "Load engine assets and report the results", version)]
struct Cli {
    /// Pipeline settings file (JSON)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Asset files to stage and load; the kind follows the extension
    #[arg(value_name = "ASSET")]
    assets: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Latch Engine v{}", latch_core::VERSION);

    let settings = match &args.settings {
        Some(path) => PipelineSettings::from_file(path)
            .with_context(|| format!("loading settings from '{}'", path.display()))?,
        None => PipelineSettings::default(),
    };

    let pipeline = AssetPipeline::new(settings);
    pipeline.add_global_listener(|event| {
        tracing::info!("{} '{}': {}", event.id, event.name, event.state_str());
    });
    pipeline.init();

    let mut ids = Vec::new();
    for path in &args.assets {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("asset")
            .to_string();
        match pipeline.stage_file(AssetKind::from_path(path), name, path.clone()) {
            Some(record) => ids.push(record.id()),
            None => tracing::warn!("could not stage '{}'", path.display()),
        }
    }
    if ids.is_empty() {
        tracing::info!("no assets given; see `latch --help`");
        pipeline.shutdown();
        return Ok(());
    }

    pipeline.load(&ids);
    let deadline = Instant::now() + LOAD_TIMEOUT;
    while !ids.iter().all(|&id| pipeline.state(id).is_settled()) {
        if Instant::now() >= deadline {
            tracing::warn!("gave up waiting after {:?}", LOAD_TIMEOUT);
            break;
        }
        pipeline.on_update();
        thread::sleep(TICK);
    }
    pipeline.on_update();

    let mut failed = 0;
    for record in pipeline.records() {
        match record.state() {
            AssetState::Loaded => {
                if let Some(payload) = record.payload() {
                    tracing::info!("{} '{}': {}", record.kind(), record.name(), describe(&payload));
                }
            }
            AssetState::Failed => {
                failed += 1;
                tracing::error!(
                    "{} '{}': {}",
                    record.kind(),
                    record.name(),
                    record.message().unwrap_or_default()
                );
            }
            state => tracing::warn!("{} '{}' is still {}", record.kind(), record.name(), state),
        }
    }

    pipeline.shutdown();
    if failed > 0 {
        anyhow::bail!("{} of {} assets failed to load", failed, ids.len());
    }
    Ok(())
}

fn describe(payload: &AssetPayload) -> String {
    match payload {
        AssetPayload::Texture(texture) => format!("{}x{} RGBA8", texture.width, texture.height),
        AssetPayload::Mesh(mesh) => format!(
            "{} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        ),
        AssetPayload::Shader(shader) => {
            format!("{} stage, {} bytes", shader.stage.as_str(), shader.source.len())
        }
        AssetPayload::ShaderProgram(program) => format!(
            "program, {} + {} bytes",
            program.vertex_source.len(),
            program.fragment_source.len()
        ),
        AssetPayload::Raw(bytes) => format!("{} bytes", bytes.len()),
    }
}
