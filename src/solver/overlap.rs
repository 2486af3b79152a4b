//! Descriptor-matching overlap detector.
//!
//! Matches cloud points between two maps by Hamming distance, then estimates
//! the relating Sim3 from the matched 3D positions.

use nalgebra::Vector3;
use tracing::debug;

use crate::api::{OverlapDetector, OverlapResult};
use crate::map::{CameraParameters, Map, PointId};

use super::align::{align_sim3_ransac, AlignConfig};

/// One descriptor match: (global id, local id, global position, local position).
type PointMatch = (PointId, PointId, Vector3<f64>, Vector3<f64>);

/// Maximum Hamming distance for a descriptor match.
const DEFAULT_MAX_HAMMING: u32 = 50;

/// Overlap detector built on brute-force descriptor matching and Sim3 RANSAC.
pub struct DescriptorOverlapDetector {
    max_hamming: u32,
    align: AlignConfig,
    camera: Option<CameraParameters>,
}

impl DescriptorOverlapDetector {
    pub fn new() -> Self {
        Self {
            max_hamming: DEFAULT_MAX_HAMMING,
            align: AlignConfig::default(),
            camera: None,
        }
    }

    pub fn with_align_config(align: AlignConfig) -> Self {
        Self {
            align,
            ..Self::new()
        }
    }

    /// Best descriptor match in `global` for each point of `local`.
    fn match_points(&self, global: &Map, local: &Map) -> Vec<PointMatch> {
        let mut matches = Vec::new();
        for lp in local.point_cloud().iter() {
            let mut best: Option<(PointId, Vector3<f64>, u32)> = None;
            for gp in global.point_cloud().iter() {
                let dist = lp.descriptor.distance(&gp.descriptor);
                if dist <= self.max_hamming && best.map_or(true, |(_, _, d)| dist < d) {
                    best = Some((gp.id, gp.position, dist));
                }
            }
            if let Some((gp_id, gp_pos, _)) = best {
                matches.push((gp_id, lp.id, gp_pos, lp.position));
            }
        }
        matches
    }
}

impl Default for DescriptorOverlapDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlapDetector for DescriptorOverlapDetector {
    fn set_camera_parameters(&mut self, params: &CameraParameters) {
        self.camera = Some(params.clone());
    }

    fn detect(&self, global: &Map, local: &Map) -> Option<OverlapResult> {
        let matches = self.match_points(global, local);
        debug!(candidates = matches.len(), "descriptor matches for overlap");
        if matches.len() < self.align.min_inliers {
            return None;
        }

        // Transform maps local-frame positions into the global frame.
        let source: Vec<_> = matches.iter().map(|&(_, _, _, lp)| lp).collect();
        let target: Vec<_> = matches.iter().map(|&(_, _, gp, _)| gp).collect();

        let result = align_sim3_ransac(&source, &target, &self.align)?;
        let matched_points = result
            .inliers
            .iter()
            .map(|&i| (matches[i].0, matches[i].1))
            .collect();

        Some(OverlapResult {
            transform: result.transform,
            matched_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Sim3;
    use crate::map::Descriptor;
    use nalgebra::{UnitQuaternion, Vector3};
    use rand::prelude::*;

    fn unique_descriptor(i: u32) -> Descriptor {
        let mut bytes = [0u8; 32];
        bytes[0] = (i & 0xff) as u8;
        bytes[1] = ((i >> 8) & 0xff) as u8;
        bytes[2] = 0xa5;
        Descriptor(bytes)
    }

    fn overlapping_maps() -> (Map, Map, Sim3) {
        let truth = Sim3 {
            rotation: UnitQuaternion::from_euler_angles(0.0, 0.3, 0.0),
            translation: Vector3::new(1.0, 0.0, -2.0),
            scale: 1.0,
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(13);
        let mut global = Map::new();
        let mut local = Map::new();
        for i in 0..30u32 {
            let p_global = Vector3::new(
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-4.0..4.0),
                rng.gen_range(2.0..8.0),
            );
            global.add_point(p_global, unique_descriptor(i));
            // same landmark expressed in the local frame
            local.add_point(truth.inverse().transform_point(&p_global), unique_descriptor(i));
        }
        (global, local, truth)
    }

    #[test]
    fn detects_overlap_and_recovers_transform() {
        let (global, local, truth) = overlapping_maps();
        let detector = DescriptorOverlapDetector::new();
        let result = detector.detect(&global, &local).unwrap();
        assert!(result.matched_points.len() >= 25);
        assert!((result.transform.translation - truth.translation).norm() < 1e-6);
    }

    #[test]
    fn respects_configured_inlier_requirement() {
        let (global, local, _) = overlapping_maps();
        // 30 shared landmarks cannot satisfy a 31-inlier consensus
        let detector = DescriptorOverlapDetector::with_align_config(AlignConfig {
            min_inliers: 31,
            ..AlignConfig::default()
        });
        assert!(detector.detect(&global, &local).is_none());
    }

    #[test]
    fn no_overlap_when_descriptors_disjoint() {
        let (global, _, _) = overlapping_maps();
        let mut stranger = Map::new();
        for i in 0..30u32 {
            let mut bytes = [0xffu8; 32];
            bytes[0] = i as u8;
            stranger.add_point(Vector3::new(i as f64, 0.0, 1.0), Descriptor(bytes));
        }
        let detector = DescriptorOverlapDetector::new();
        assert!(detector.detect(&global, &stranger).is_none());
    }
}
