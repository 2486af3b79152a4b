//! Merge worker: the single background task draining the ingress queue.
//!
//! Per dequeued map the worker either bootstraps an empty global map or runs
//! the fusion sequence: overlap detection (floating maps only), merge,
//! incremental update, bundle adjustment, quality gate, pruning, persist.
//! Failures are terminal-per-map: the map is dropped, logged, and never
//! requeued; submitters get no notification (at-most-once by design).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::{Bundler, MapFusion, MapUpdater, OverlapDetector};
use crate::map::{KeyFrameId, Map};
use crate::pipeline::queue::{Dequeued, IngressQueue};
use crate::pipeline::shared::SharedState;

/// Timeout for dequeuing. Bounds how long shutdown and start/stop
/// transitions take to be observed.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Idle wait while the pipeline is not running. Queued maps stay queued.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// The injected merge engine. Its mutex doubles as the process lock: the
/// whole fusion sequence runs under it, independent of the map lock, so
/// readers are blocked only during actual store access.
pub struct MergeComponentsInner {
    pub overlap: Box<dyn OverlapDetector>,
    pub fusion: Box<dyn MapFusion>,
    pub updater: Box<dyn MapUpdater>,
    pub bundler: Box<dyn Bundler>,
}

pub type SharedComponents = Arc<Mutex<MergeComponentsInner>>;

/// Background merge task.
pub struct MergeWorker {
    shared: Arc<SharedState>,
    components: SharedComponents,
    /// Residual error above which a merge is discarded.
    residual_threshold: f64,
}

impl MergeWorker {
    pub fn new(
        shared: Arc<SharedState>,
        components: SharedComponents,
        residual_threshold: f64,
    ) -> Self {
        Self {
            shared,
            components,
            residual_threshold,
        }
    }

    /// Main thread loop: drain the queue until shutdown.
    pub fn run(&self, queue: Arc<IngressQueue>) {
        loop {
            if self.shared.is_shutdown_requested() {
                break;
            }
            if !self.shared.is_running() {
                std::thread::sleep(IDLE_WAIT);
                continue;
            }
            match queue.pop_timeout(RECV_TIMEOUT) {
                Dequeued::Entry(map) => self.process_map(map),
                Dequeued::Empty => continue,
                Dequeued::Closed => break,
            }
        }
        debug!("merge worker exiting");
    }

    /// Merge one dequeued local map into the global map.
    fn process_map(&self, mut local: Map) {
        if local.is_empty() {
            debug!("ignoring empty submitted map");
            return;
        }

        // Process lock: one fusion at a time, held for the whole sequence.
        let components = self.components.lock();

        // Bootstrap: the submitted map becomes the global map outright.
        {
            let mut state = self.shared.map_state.lock();
            if state.empty || state.map.is_empty() {
                info!(
                    points = local.num_points(),
                    keyframes = local.num_keyframes(),
                    "bootstrapping global map from submitted map"
                );
                state.store.set(local);
                if let Err(e) = state.store.save() {
                    error!(error = %e, "failed to persist bootstrapped global map");
                }
                state.map = state.store.get();
                state.empty = false;
                return;
            }
        }

        // Fusion runs on a working copy reloaded from durable state; shared
        // state is only touched again after the quality gate passes.
        let mut global = {
            let mut state = self.shared.map_state.lock();
            if let Err(e) = state.store.load() {
                warn!(error = %e, "could not reload global map from store, using in-memory state");
                let snapshot = state.map.clone();
                state.store.set(snapshot);
            }
            state.store.get()
        };

        // A fixed parent transform is authoritative; only floating maps go
        // through overlap detection.
        let transform = match local.coordinate_system().parent_transform().cloned() {
            Some(transform) => transform,
            None => {
                info!("submitted map is floating, running overlap detection");
                match components.overlap.detect(&global, &local) {
                    Some(result) => {
                        info!(
                            overlaps = result.matched_points.len(),
                            "overlap detected, fixing submitted map's coordinate system"
                        );
                        local
                            .coordinate_system_mut()
                            .set_parent_transform(result.transform.clone());
                        result.transform
                    }
                    None => {
                        info!("no overlap detected, discarding submitted map");
                        return;
                    }
                }
            }
        };

        let fusion = match components.fusion.merge(&mut local, &mut global, &transform) {
            Some(result) => result,
            None => {
                info!("cannot merge submitted map into global map, discarding");
                return;
            }
        };
        info!(
            matches = fusion.num_matches,
            error = fusion.error,
            "maps merged"
        );

        // Keyframes of the submitted map are new from the global map's
        // perspective (fusion rewrote their ids to the global ones).
        let new_keyframes: Vec<KeyFrameId> = local.keyframes().ids().collect();
        debug!(count = new_keyframes.len(), "new keyframes");
        if let Err(e) = components.updater.update(&mut global, &new_keyframes) {
            warn!(error = %e, "incremental map update failed, discarding merge");
            return;
        }

        let camera = self.shared.camera.read().clone();
        let Some(camera) = camera else {
            // start() requires camera parameters, so this cannot happen in a
            // correctly driven pipeline.
            warn!("camera parameters unset, discarding merge");
            return;
        };
        let residual = components.bundler.bundle_adjustment(&mut global, &camera);
        info!(residual, "bundle adjustment complete");

        // Quality gate: nothing was committed yet, so a discard here leaves
        // the global map bit-for-bit at its pre-merge state.
        if residual > self.residual_threshold {
            warn!(
                residual,
                threshold = self.residual_threshold,
                "residual over threshold, discarding merge"
            );
            return;
        }

        let mut state = self.shared.map_state.lock();
        if state.empty {
            // A reset landed while the fusion ran; committing would
            // resurrect pre-reset data.
            info!("global map was reset during merge, discarding result");
            return;
        }
        state.store.set(global);
        let pruned_points = state.store.point_cloud_pruning();
        let pruned_keyframes = state.store.keyframe_pruning();
        debug!(pruned_points, pruned_keyframes, "pruning complete");
        if let Err(e) = state.store.save() {
            error!(error = %e, "failed to persist merged global map");
        }
        state.map = state.store.get();
        info!(
            points = state.map.num_points(),
            keyframes = state.map.num_keyframes(),
            "global map updated"
        );
    }
}
