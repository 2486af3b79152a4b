//! Reprojection-residual bundler.
//!
//! Computes the mean reprojection residual of the map's observations. The
//! value feeds the pipeline's merge-quality gate: a high residual after a
//! fusion means the proposed alignment is inconsistent and the merge is
//! discarded. This implementation does not refine poses or points; any
//! engine honoring the `Bundler` contract can replace it.

use tracing::debug;

use crate::api::Bundler;
use crate::map::{CameraParameters, Map};

/// Bundler returning the mean reprojection residual in pixels.
pub struct ReprojectionBundler;

impl ReprojectionBundler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReprojectionBundler {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundler for ReprojectionBundler {
    fn bundle_adjustment(&self, map: &mut Map, params: &CameraParameters) -> f64 {
        let mut residual_sum = 0.0;
        let mut count = 0usize;

        for point in map.point_cloud().iter() {
            for (kf_id, measured) in &point.observations {
                let Some(kf) = map.keyframes().get(*kf_id) else {
                    continue;
                };
                let p_cam = kf.pose.inverse().transform_point(&point.position);
                let Some(projected) = params.project(&p_cam) else {
                    continue;
                };
                residual_sum += (projected - measured).norm();
                count += 1;
            }
        }

        let residual = if count > 0 {
            residual_sum / count as f64
        } else {
            0.0
        };
        debug!(observations = count, residual, "bundle adjustment residual");
        residual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SE3;
    use crate::map::Descriptor;
    use nalgebra::{Vector2, Vector3};

    #[test]
    fn consistent_observations_yield_zero_residual() {
        let params = CameraParameters::default();
        let mut map = Map::new();
        let kf = map.add_keyframe(SE3::identity(), vec![]);
        let position = Vector3::new(0.5, -0.2, 4.0);
        let pt = map.add_point(position, Descriptor::default());
        let pixel = params.project(&position).unwrap();
        map.add_observation(kf, pt, pixel);

        let residual = ReprojectionBundler::new().bundle_adjustment(&mut map, &params);
        assert!(residual < 1e-9);
    }

    #[test]
    fn displaced_point_raises_residual() {
        let params = CameraParameters::default();
        let mut map = Map::new();
        let kf = map.add_keyframe(SE3::identity(), vec![]);
        let position = Vector3::new(0.5, -0.2, 4.0);
        let pt = map.add_point(position, Descriptor::default());
        // record the measurement, then move the landmark
        let pixel = params.project(&position).unwrap();
        map.add_observation(kf, pt, pixel);
        map.point_cloud_mut().get_mut(pt).unwrap().position += Vector3::new(1.0, 0.0, 0.0);

        let residual = ReprojectionBundler::new().bundle_adjustment(&mut map, &params);
        assert!(residual > 10.0);
    }

    #[test]
    fn empty_map_has_zero_residual() {
        let params = CameraParameters::default();
        let mut map = Map::new();
        assert_eq!(
            ReprojectionBundler::new().bundle_adjustment(&mut map, &params),
            0.0
        );
    }
}
