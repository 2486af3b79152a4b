//! The map: point cloud + keyframe collection + coordinate system.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::geometry::SE3;

use super::cloud_point::PointCloud;
use super::coordinate_system::CoordinateSystem;
use super::keyframe::KeyFrameCollection;
use super::types::{Descriptor, KeyFrameId, PointId};

/// A 3D map: cloud points, keyframes ordered by id, and the coordinate
/// system relating the map's frame to the global reference frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Map {
    point_cloud: PointCloud,
    keyframes: KeyFrameCollection,
    coordinate_system: CoordinateSystem,
}

impl Map {
    /// A new empty map with a floating coordinate system.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the map holds neither points nor keyframes.
    pub fn is_empty(&self) -> bool {
        self.point_cloud.is_empty() && self.keyframes.is_empty()
    }

    pub fn num_points(&self) -> usize {
        self.point_cloud.len()
    }

    pub fn num_keyframes(&self) -> usize {
        self.keyframes.len()
    }

    pub fn point_cloud(&self) -> &PointCloud {
        &self.point_cloud
    }

    pub fn point_cloud_mut(&mut self) -> &mut PointCloud {
        &mut self.point_cloud
    }

    pub fn keyframes(&self) -> &KeyFrameCollection {
        &self.keyframes
    }

    pub fn keyframes_mut(&mut self) -> &mut KeyFrameCollection {
        &mut self.keyframes
    }

    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.coordinate_system
    }

    pub fn coordinate_system_mut(&mut self) -> &mut CoordinateSystem {
        &mut self.coordinate_system
    }

    /// Add a keyframe and return its id.
    pub fn add_keyframe(&mut self, pose: SE3, descriptors: Vec<Descriptor>) -> KeyFrameId {
        self.keyframes.add_keyframe(pose, descriptors)
    }

    /// Add a cloud point and return its id.
    pub fn add_point(&mut self, position: Vector3<f64>, descriptor: Descriptor) -> PointId {
        self.point_cloud.add_point(position, descriptor)
    }

    /// Create the bidirectional observation link between a keyframe and a
    /// point, recording the measured pixel.
    pub fn add_observation(&mut self, kf_id: KeyFrameId, point_id: PointId, pixel: Vector2<f64>) {
        if let Some(point) = self.point_cloud.get_mut(point_id) {
            point.add_observation(kf_id, pixel);
        }
        if let Some(kf) = self.keyframes.get_mut(kf_id) {
            kf.observed_points.insert(point_id);
        }
    }
}
