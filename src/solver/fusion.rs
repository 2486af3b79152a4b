//! Point-transfer map fusion.
//!
//! Moves a local map's geometry into the global frame under the given Sim3,
//! deduplicating points already present in the global map and rewriting the
//! local keyframe ids to the ids assigned by the global map.

use std::collections::BTreeMap;

use tracing::debug;

use crate::api::{FusionResult, MapFusion};
use crate::geometry::Sim3;
use crate::map::{KeyFrame, KeyFrameId, Map};

/// Spatial radius within which a descriptor match is treated as the same
/// landmark.
const DEFAULT_MERGE_RADIUS: f64 = 0.1;

/// Maximum Hamming distance for landmark deduplication.
const DEFAULT_MAX_HAMMING: u32 = 50;

/// Map fusion that transfers points and keyframes under the transform.
pub struct TransformMapFusion {
    merge_radius: f64,
    max_hamming: u32,
}

impl TransformMapFusion {
    pub fn new() -> Self {
        Self {
            merge_radius: DEFAULT_MERGE_RADIUS,
            max_hamming: DEFAULT_MAX_HAMMING,
        }
    }
}

impl Default for TransformMapFusion {
    fn default() -> Self {
        Self::new()
    }
}

impl MapFusion for TransformMapFusion {
    fn merge(&self, local: &mut Map, global: &mut Map, transform: &Sim3) -> Option<FusionResult> {
        if local.is_empty() {
            return None;
        }

        // Transfer keyframes first so point observations can be remapped.
        let mut kf_remap: BTreeMap<KeyFrameId, KeyFrameId> = BTreeMap::new();
        for kf in local.keyframes().iter() {
            let new_id = global
                .keyframes_mut()
                .add_keyframe(transform.transform_pose(&kf.pose), kf.descriptors.clone());
            kf_remap.insert(kf.id, new_id);
        }

        let mut num_matches = 0u32;
        let mut residual_sum = 0.0;
        for point in local.point_cloud().iter() {
            let position = transform.transform_point(&point.position);

            // Existing landmark within the merge radius and descriptor budget?
            let duplicate = global
                .point_cloud()
                .iter()
                .filter(|gp| gp.descriptor.distance(&point.descriptor) <= self.max_hamming)
                .map(|gp| (gp.id, (gp.position - position).norm()))
                .filter(|(_, dist)| *dist <= self.merge_radius)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let target_id = match duplicate {
                Some((gp_id, dist)) => {
                    num_matches += 1;
                    residual_sum += dist;
                    gp_id
                }
                None => global
                    .point_cloud_mut()
                    .add_point(position, point.descriptor),
            };

            for (kf_id, pixel) in &point.observations {
                let Some(new_kf) = kf_remap.get(kf_id) else {
                    continue;
                };
                global.add_observation(*new_kf, target_id, *pixel);
            }
        }

        // Rewrite the local map's ids so callers can collect the keyframe ids
        // the global map now knows them by.
        let old_kfs: Vec<KeyFrame> = local.keyframes().iter().cloned().collect();
        *local.keyframes_mut() = Default::default();
        for mut kf in old_kfs {
            kf.id = kf_remap[&kf.id];
            local.keyframes_mut().insert_keyframe(kf);
        }
        for point in local.point_cloud_mut().iter_mut() {
            point.observations = point
                .observations
                .iter()
                .filter_map(|(kf, px)| kf_remap.get(kf).map(|new| (*new, *px)))
                .collect();
        }

        let error = if num_matches > 0 {
            residual_sum / num_matches as f64
        } else {
            0.0
        };
        debug!(num_matches, error, "map fusion complete");

        Some(FusionResult {
            transform: transform.clone(),
            num_matches,
            error,
        })
    }
}
