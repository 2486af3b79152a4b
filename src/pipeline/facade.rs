//! Pipeline facade: lifecycle control and the request surface.
//!
//! Lifecycle: `init()` and `set_camera_parameters()` (in either order) must
//! both complete before `start()`. Submissions are fire-and-forget: a merge
//! failure is never reported back to the submitter, who can only observe it
//! by polling `get_map()`. Delivery is at most once.

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::api::{Bundler, KeyframeRetriever, MapFusion, MapStore, MapUpdater, OverlapDetector};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::map::{CameraParameters, Frame, Map};

use super::queue::IngressQueue;
use super::shared::SharedState;
use super::worker::{MergeComponentsInner, MergeWorker, SharedComponents};

/// The injected collaborators the merge worker drives.
pub struct MergeComponents {
    pub overlap: Box<dyn OverlapDetector>,
    pub fusion: Box<dyn MapFusion>,
    pub updater: Box<dyn MapUpdater>,
    pub bundler: Box<dyn Bundler>,
}

/// The map-update pipeline.
pub struct MapUpdatePipeline {
    shared: Arc<SharedState>,
    queue: Arc<IngressQueue>,
    components: SharedComponents,
    retriever: Box<dyn KeyframeRetriever>,
    config: PipelineConfig,
    worker_handle: Option<JoinHandle<()>>,
}

impl MapUpdatePipeline {
    /// Wire up a pipeline. The worker is constructed suspended; its thread
    /// is spawned by the first `init()`.
    pub fn new(
        store: Box<dyn MapStore>,
        components: MergeComponents,
        retriever: Box<dyn KeyframeRetriever>,
        config: PipelineConfig,
    ) -> Self {
        let shared = SharedState::new(store);
        let queue = Arc::new(IngressQueue::new(
            config.queue_capacity,
            config.overflow_policy,
        ));
        let components = Arc::new(Mutex::new(MergeComponentsInner {
            overlap: components.overlap,
            fusion: components.fusion,
            updater: components.updater,
            bundler: components.bundler,
        }));
        Self {
            shared,
            queue,
            components,
            retriever,
            config,
            worker_handle: None,
        }
    }

    /// Initialize the pipeline: load the persisted global map and start the
    /// merge worker's background execution. Idempotent.
    ///
    /// An empty or missing store is a valid starting state, not a fault: the
    /// in-memory global map starts empty and the first submission bootstraps
    /// it.
    pub fn init(&mut self) -> Result<()> {
        if !self.shared.mark_initialized() {
            return Ok(());
        }

        {
            let mut state = self.shared.map_state.lock();
            match state.store.load() {
                Ok(()) => {
                    state.map = state.store.get();
                    state.empty = state.map.is_empty();
                    info!(
                        points = state.map.num_points(),
                        keyframes = state.map.num_keyframes(),
                        "loaded global map from store"
                    );
                }
                Err(e) => {
                    info!(error = %e, "no persisted global map, starting empty");
                    state.map = Map::new();
                    state.empty = true;
                }
            }
        }

        let shared = Arc::clone(&self.shared);
        let components = Arc::clone(&self.components);
        let queue = Arc::clone(&self.queue);
        let threshold = self.config.residual_error_threshold;
        self.worker_handle = Some(std::thread::spawn(move || {
            let worker = MergeWorker::new(shared, components, threshold);
            worker.run(queue);
        }));
        info!("map update pipeline initialized");
        Ok(())
    }

    /// Set the camera parameters and forward them to the overlap detector
    /// and the incremental updater. Required before `start()`; rejected once
    /// the pipeline is running.
    pub fn set_camera_parameters(&mut self, params: &CameraParameters) -> Result<()> {
        if self.shared.is_running() {
            return Err(PipelineError::InvalidState(
                "cannot set camera parameters while the pipeline is running",
            ));
        }
        *self.shared.camera.write() = Some(params.clone());
        let mut components = self.components.lock();
        components.overlap.set_camera_parameters(params);
        components.updater.set_camera_parameters(params);
        Ok(())
    }

    /// Start processing submissions. No-op if already running.
    pub fn start(&mut self) -> Result<()> {
        if !self.shared.is_initialized() {
            return Err(PipelineError::InvalidState(
                "init() must complete before start()",
            ));
        }
        if !self.shared.has_camera_parameters() {
            return Err(PipelineError::InvalidState(
                "camera parameters must be set before start()",
            ));
        }
        if self.shared.is_running() {
            return Ok(());
        }
        self.shared.set_running(true);
        info!("map update pipeline started");
        Ok(())
    }

    /// Stop processing submissions. No-op if not running. Queued maps stay
    /// queued; an in-flight merge runs to completion.
    pub fn stop(&mut self) -> Result<()> {
        if self.shared.is_running() {
            self.shared.set_running(false);
            info!("map update pipeline stopped");
        }
        Ok(())
    }

    /// Submit a local map for merging. Fire-and-forget: returns as soon as
    /// the map is queued; merge failures are only observable via `get_map()`.
    pub fn submit_map(&self, map: Map) -> Result<()> {
        if !self.shared.is_running() {
            return Err(PipelineError::InvalidState(
                "submit_map() requires a running pipeline",
            ));
        }
        self.queue.push(map);
        Ok(())
    }

    /// Current global map, reloaded from durable state under the map lock.
    pub fn get_map(&self) -> Result<Map> {
        if !self.shared.is_initialized() {
            return Err(PipelineError::InvalidState(
                "get_map() requires an initialized pipeline",
            ));
        }
        let mut state = self.shared.map_state.lock();
        if !state.empty {
            state
                .store
                .load()
                .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
            state.map = state.store.get();
        }
        Ok(state.map.clone())
    }

    /// Submap of keyframes around the best retrieval match for `frame`.
    pub fn get_submap(&self, frame: &Frame) -> Result<Map> {
        if !self.shared.is_initialized() {
            return Err(PipelineError::InvalidState(
                "get_submap() requires an initialized pipeline",
            ));
        }
        let state = self.shared.map_state.lock();
        let candidates = self.retriever.retrieve(frame, &state.map);
        let Some(best) = candidates.first() else {
            return Err(PipelineError::RetrievalFailed(
                "no keyframe matches the query frame".into(),
            ));
        };
        state
            .store
            .submap(*best, self.config.submap_keyframe_count)
            .ok_or_else(|| {
                PipelineError::RetrievalFailed(format!(
                    "matched keyframe {best} is not in the stored map"
                ))
            })
    }

    /// Delete the persisted map and replace the global map with an empty
    /// one. The next submission bootstraps from scratch.
    pub fn reset_map(&self) -> Result<()> {
        let mut state = self.shared.map_state.lock();
        state
            .store
            .delete()
            .map_err(|e| PipelineError::StorageFailed(e.to_string()))?;
        state.map = Map::new();
        state.empty = true;
        info!("global map reset");
        Ok(())
    }

    /// Gracefully shut the worker down and join its thread. An in-flight
    /// merge is allowed to finish (the worker observes shutdown within one
    /// poll quantum once it is done).
    pub fn shutdown(&mut self) {
        self.shared.set_running(false);
        self.shared.request_shutdown();
        if let Some(handle) = self.worker_handle.take() {
            if handle.join().is_err() {
                warn!("merge worker thread panicked");
            }
        }
    }
}

impl Drop for MapUpdatePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
