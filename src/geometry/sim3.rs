//! Sim3: 7-DOF similarity transformation (rotation + translation + scale).
//!
//! Relates one map's coordinate frame to another's. Monocular reconstructions
//! carry an unknown scale, so the transform between a submitted local map and
//! the global map is a full similarity rather than a rigid SE3.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::SE3;

/// 7-DOF similarity transformation.
///
/// Transforms points as: p' = s * R * p + t
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sim3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
    pub scale: f64,
}

impl Sim3 {
    /// Identity transformation (no rotation, no translation, scale = 1).
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
            scale: 1.0,
        }
    }

    /// Construct from rotation matrix, translation, and scale.
    pub fn from_rts(rotation: Matrix3<f64>, translation: Vector3<f64>, scale: f64) -> Self {
        let rot3 = Rotation3::from_matrix_unchecked(rotation);
        Self {
            rotation: UnitQuaternion::from_rotation_matrix(&rot3),
            translation,
            scale,
        }
    }

    /// Inverse transformation: S^{-1} = [(1/s)R^T | -(1/s)R^T*t].
    pub fn inverse(&self) -> Self {
        let rot_inv = self.rotation.inverse();
        let scale_inv = 1.0 / self.scale;
        Self {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation) * scale_inv,
            scale: scale_inv,
        }
    }

    /// Compose two Sim3 transforms: self ∘ other.
    pub fn compose(&self, other: &Sim3) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.scale * (self.rotation * other.translation) + self.translation,
            scale: self.scale * other.scale,
        }
    }

    /// Transform a single point: p' = s * R * p + t.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.scale * (self.rotation * p) + self.translation
    }

    /// Transform a camera pose (T_wc) into this transform's target frame.
    ///
    /// The rotation composes, the camera center moves like a point.
    pub fn transform_pose(&self, pose: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * pose.rotation,
            translation: self.transform_point(&pose.translation),
        }
    }
}

impl Default for Sim3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn sample() -> Sim3 {
        Sim3 {
            rotation: UnitQuaternion::from_euler_angles(0.1, FRAC_PI_4, -0.2),
            translation: Vector3::new(1.0, 2.0, -0.5),
            scale: 1.7,
        }
    }

    #[test]
    fn inverse_roundtrip() {
        let s = sample();
        let p = Vector3::new(-2.0, 0.3, 4.0);
        let back = s.inverse().transform_point(&s.transform_point(&p));
        assert!((back - p).norm() < 1e-9);
    }

    #[test]
    fn compose_matches_sequential_application() {
        let a = sample();
        let b = Sim3 {
            rotation: UnitQuaternion::from_euler_angles(0.0, 0.2, 0.0),
            translation: Vector3::new(0.0, -1.0, 0.0),
            scale: 0.5,
        };
        let p = Vector3::new(1.0, 1.0, 1.0);
        let composed = a.compose(&b).transform_point(&p);
        let sequential = a.transform_point(&b.transform_point(&p));
        assert!((composed - sequential).norm() < 1e-9);
    }

    #[test]
    fn pose_center_moves_like_a_point() {
        let s = sample();
        let pose = SE3::from_translation(Vector3::new(3.0, 0.0, 0.0));
        let moved = s.transform_pose(&pose);
        assert!((moved.translation - s.transform_point(&pose.translation)).norm() < 1e-12);
    }
}
