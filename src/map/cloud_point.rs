//! Cloud points and the point cloud container.

use std::collections::BTreeMap;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::types::{Descriptor, KeyFrameId, PointId};

/// A 3D landmark with its descriptor and the keyframes observing it.
///
/// Observations map each observing keyframe to the pixel location where the
/// point was measured; the bundler uses them to compute the reprojection
/// residual after a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudPoint {
    pub id: PointId,
    pub position: Vector3<f64>,
    pub descriptor: Descriptor,
    /// Observing keyframe -> measured pixel coordinates.
    pub observations: BTreeMap<KeyFrameId, Vector2<f64>>,
}

impl CloudPoint {
    pub fn new(id: PointId, position: Vector3<f64>, descriptor: Descriptor) -> Self {
        Self {
            id,
            position,
            descriptor,
            observations: BTreeMap::new(),
        }
    }

    /// Record that `kf_id` observes this point at the given pixel.
    pub fn add_observation(&mut self, kf_id: KeyFrameId, pixel: Vector2<f64>) {
        self.observations.insert(kf_id, pixel);
    }
}

/// Collection of cloud points, ordered by identifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud {
    points: BTreeMap<PointId, CloudPoint>,
    next_id: u32,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point with a freshly assigned id; returns the id.
    pub fn add_point(&mut self, position: Vector3<f64>, descriptor: Descriptor) -> PointId {
        let id = PointId(self.next_id);
        self.next_id += 1;
        self.points.insert(id, CloudPoint::new(id, position, descriptor));
        id
    }

    /// Insert a fully-formed point, keeping its id.
    ///
    /// The id counter is bumped past the inserted id so later `add_point`
    /// calls never collide.
    pub fn insert_point(&mut self, point: CloudPoint) {
        self.next_id = self.next_id.max(point.id.0 + 1);
        self.points.insert(point.id, point);
    }

    pub fn get(&self, id: PointId) -> Option<&CloudPoint> {
        self.points.get(&id)
    }

    pub fn get_mut(&mut self, id: PointId) -> Option<&mut CloudPoint> {
        self.points.get_mut(&id)
    }

    pub fn remove(&mut self, id: PointId) -> Option<CloudPoint> {
        self.points.remove(&id)
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CloudPoint> {
        self.points.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CloudPoint> {
        self.points.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.points.keys().copied()
    }
}
