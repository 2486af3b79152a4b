//! Incremental map updater.
//!
//! After a fusion, the observation graph around the newly added keyframes
//! can reference points that were deduplicated away or keyframes the global
//! map never adopted. This updater restores bidirectional consistency so
//! later pruning and retrieval see a clean graph.

use tracing::debug;

use crate::api::MapUpdater;
use crate::map::{CameraParameters, KeyFrameId, Map, PointId};

/// Updater re-linking observations for new keyframes.
pub struct CovisibilityUpdater {
    camera: Option<CameraParameters>,
}

impl CovisibilityUpdater {
    pub fn new() -> Self {
        Self { camera: None }
    }
}

impl Default for CovisibilityUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl MapUpdater for CovisibilityUpdater {
    fn set_camera_parameters(&mut self, params: &CameraParameters) {
        self.camera = Some(params.clone());
    }

    fn update(&self, global: &mut Map, new_keyframes: &[KeyFrameId]) -> anyhow::Result<()> {
        let mut relinked = 0usize;

        // Rebuild each new keyframe's observed set from the point cloud: the
        // point-side observation maps are authoritative after a fusion.
        for kf_id in new_keyframes {
            let observed: Vec<PointId> = global
                .point_cloud()
                .iter()
                .filter(|p| p.observations.contains_key(kf_id))
                .map(|p| p.id)
                .collect();
            relinked += observed.len();
            if let Some(kf) = global.keyframes_mut().get_mut(*kf_id) {
                kf.observed_points = observed.into_iter().collect();
            }
        }

        debug!(
            new_keyframes = new_keyframes.len(),
            relinked, "incremental map update complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SE3;
    use crate::map::Descriptor;
    use nalgebra::{Vector2, Vector3};

    #[test]
    fn relinks_observations_for_new_keyframes() {
        let mut map = Map::new();
        let kf = map.add_keyframe(SE3::identity(), vec![]);
        let pt = map.add_point(Vector3::new(0.0, 0.0, 3.0), Descriptor::default());
        // observation recorded on the point only
        map.point_cloud_mut()
            .get_mut(pt)
            .unwrap()
            .add_observation(kf, Vector2::new(10.0, 20.0));
        assert!(!map.keyframes().get(kf).unwrap().observed_points.contains(&pt));

        let updater = CovisibilityUpdater::new();
        updater.update(&mut map, &[kf]).unwrap();
        assert!(map.keyframes().get(kf).unwrap().observed_points.contains(&pt));
    }

    #[test]
    fn drops_references_to_absent_points() {
        let mut map = Map::new();
        let kf = map.add_keyframe(SE3::identity(), vec![]);
        map.keyframes_mut()
            .get_mut(kf)
            .unwrap()
            .observed_points
            .insert(PointId(99));

        let updater = CovisibilityUpdater::new();
        updater.update(&mut map, &[kf]).unwrap();
        assert!(map.keyframes().get(kf).unwrap().observed_points.is_empty());
    }
}
