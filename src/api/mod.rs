//! Collaborator contracts consumed by the pipeline.
//!
//! The pipeline core depends only on these traits; one implementation of
//! each is selected when the facade is wired up. Reference implementations
//! live in `storage`, `solver` and `retrieval`.

use crate::geometry::Sim3;
use crate::map::{CameraParameters, Frame, KeyFrameId, Map, PointId};

/// Result of overlap detection between two maps.
#[derive(Debug, Clone)]
pub struct OverlapResult {
    /// Candidate transform mapping the local map's frame into the global frame.
    pub transform: Sim3,
    /// Matched point pairs (global point id, local point id).
    pub matched_points: Vec<(PointId, PointId)>,
}

/// Result of merging a local map into the global map.
#[derive(Debug, Clone)]
pub struct FusionResult {
    /// Transform after refinement during fusion.
    pub transform: Sim3,
    /// Number of cloud points matched between the two maps.
    pub num_matches: u32,
    /// Mean alignment residual over the matched points.
    pub error: f64,
}

/// Durable storage for the single current global map.
///
/// Every method is invoked under the pipeline's map lock; implementations do
/// not need their own synchronization.
pub trait MapStore: Send {
    /// Load the persisted map into the store.
    fn load(&mut self) -> anyhow::Result<()>;

    /// Snapshot of the store's current map.
    fn get(&self) -> Map;

    /// Replace the store's current map.
    fn set(&mut self, map: Map);

    /// Persist the store's current map.
    fn save(&self) -> anyhow::Result<()>;

    /// Delete the persisted map and clear the store's current map.
    fn delete(&mut self) -> anyhow::Result<()>;

    /// Remove redundant cloud points; returns the number removed.
    fn point_cloud_pruning(&mut self) -> usize;

    /// Remove redundant keyframes; returns the number removed.
    fn keyframe_pruning(&mut self) -> usize;

    /// Extract a submap of at most `count` keyframes around `anchor`,
    /// with the points they observe. `None` if the anchor is unknown.
    fn submap(&self, anchor: KeyFrameId, count: usize) -> Option<Map>;
}

/// Detects spatial overlap between two maps and proposes a transform.
pub trait OverlapDetector: Send {
    fn set_camera_parameters(&mut self, params: &CameraParameters);

    /// Detect overlap between `global` and `local`.
    ///
    /// `None` means no overlap was found; the caller discards the local map.
    fn detect(&self, global: &Map, local: &Map) -> Option<OverlapResult>;
}

/// Merges a local map's geometry into a global map under a given transform.
pub trait MapFusion: Send {
    /// Merge `local` into `global` under `transform`.
    ///
    /// Implementations rewrite `local`'s keyframe ids to the ids assigned in
    /// the global map, so the caller can collect the new keyframe ids from
    /// `local` afterwards. `None` means the merge failed; `global` is left
    /// unchanged in that case.
    fn merge(&self, local: &mut Map, global: &mut Map, transform: &Sim3) -> Option<FusionResult>;
}

/// Folds newly added keyframes into global map bookkeeping.
pub trait MapUpdater: Send {
    fn set_camera_parameters(&mut self, params: &CameraParameters);

    /// Update consistency structures for the given new keyframes.
    fn update(&self, global: &mut Map, new_keyframes: &[KeyFrameId]) -> anyhow::Result<()>;
}

/// Global bundle adjustment; yields the residual error used as the
/// merge-quality gate.
pub trait Bundler: Send {
    /// Adjust `map` and return the residual error.
    fn bundle_adjustment(&self, map: &mut Map, params: &CameraParameters) -> f64;
}

/// Finds keyframes in a map matching a query frame.
///
/// Queried directly from reader threads, hence the `Sync` bound; the other
/// collaborators run behind the worker's locks and only need `Send`.
pub trait KeyframeRetriever: Send + Sync {
    /// Candidate keyframe ids, best match first. Empty means no match.
    fn retrieve(&self, frame: &Frame, map: &Map) -> Vec<KeyFrameId>;
}
