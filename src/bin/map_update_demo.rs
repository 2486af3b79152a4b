//! Map update demo client.
//!
//! Loads prebuilt local map snapshots and submits them to the pipeline one
//! by one, polling the global map after each submission, the same flow a
//! remote producer would drive.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{error, info};

use map_update::api::MapStore;
use map_update::config::{log_level_from_env, PipelineConfig};
use map_update::map::CameraParameters;
use map_update::retrieval::BowRetriever;
use map_update::solver::{
    CovisibilityUpdater, DescriptorOverlapDetector, ReprojectionBundler, TransformMapFusion,
};
use map_update::storage::FileMapStore;
use map_update::{MapUpdatePipeline, MergeComponents};

/// Default configuration file name, looked up in the working directory.
const DEFAULT_CONFIG: &str = "map_update_demo.toml";

/// How long to wait for the worker to drain after each submission.
const DRAIN_WAIT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "map_update_demo", version, about = "Map update pipeline demo client")]
struct Args {
    /// Path to the demo configuration file.
    #[arg(default_value = DEFAULT_CONFIG)]
    config: PathBuf,
}

/// Demo configuration: where the global map lives and which local map
/// snapshots to submit.
#[derive(Debug, Deserialize)]
struct DemoConfig {
    /// Global map snapshot path.
    global_map: PathBuf,
    /// Local map snapshots submitted in order.
    local_maps: Vec<PathBuf>,
    #[serde(default)]
    camera: CameraParameters,
    #[serde(default)]
    pipeline: PipelineConfig,
}

fn run(args: &Args) -> Result<()> {
    let text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading configuration file {}", args.config.display()))?;
    let config: DemoConfig = toml::from_str(&text)
        .with_context(|| format!("parsing configuration file {}", args.config.display()))?;

    let components = MergeComponents {
        overlap: Box::new(DescriptorOverlapDetector::new()),
        fusion: Box::new(TransformMapFusion::new()),
        updater: Box::new(CovisibilityUpdater::new()),
        bundler: Box::new(ReprojectionBundler::new()),
    };
    let mut pipeline = MapUpdatePipeline::new(
        Box::new(FileMapStore::new(&config.global_map)),
        components,
        Box::new(BowRetriever::new()),
        config.pipeline.clone(),
    );

    pipeline.init()?;
    pipeline.set_camera_parameters(&config.camera)?;
    pipeline.start()?;

    for (i, path) in config.local_maps.iter().enumerate() {
        let mut store = FileMapStore::new(path);
        store
            .load()
            .with_context(|| format!("loading local map {}", path.display()))?;
        let local = store.get();
        info!(
            index = i + 1,
            points = local.num_points(),
            keyframes = local.num_keyframes(),
            "submitting local map"
        );
        pipeline.submit_map(local)?;

        // Fire-and-forget: poll the global map to observe the merge.
        std::thread::sleep(DRAIN_WAIT);
        let global = pipeline.get_map()?;
        info!(
            points = global.num_points(),
            keyframes = global.num_keyframes(),
            "global map after submission"
        );
    }

    pipeline.stop()?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level_from_env())
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "demo failed");
            ExitCode::FAILURE
        }
    }
}
