//! SE(3) rigid transformation: rotation + translation.
//!
//! Used for keyframe poses (T_wc: camera-to-world convention).

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid body transformation: rotation + translation.
///
/// Transforms points as: p' = R * p + t
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    /// Identity transformation.
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Construct from rotation and translation.
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pure translation, no rotation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation,
        }
    }

    /// Inverse transformation: T^{-1} = [R^T | -R^T * t].
    pub fn inverse(&self) -> Self {
        let rot_inv = self.rotation.inverse();
        Self {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }

    /// Compose two transforms: self ∘ other.
    pub fn compose(&self, other: &SE3) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Transform a single point: p' = R * p + t.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn inverse_roundtrip() {
        let t = SE3::new(
            UnitQuaternion::from_euler_angles(0.1, -0.3, FRAC_PI_2),
            Vector3::new(1.0, -2.0, 0.5),
        );
        let p = Vector3::new(3.0, 4.0, 5.0);
        let back = t.inverse().transform_point(&t.transform_point(&p));
        assert!((back - p).norm() < 1e-9);
    }

    #[test]
    fn compose_matches_sequential_application() {
        let a = SE3::new(
            UnitQuaternion::from_euler_angles(0.2, 0.0, 0.1),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let b = SE3::from_translation(Vector3::new(2.0, 0.0, 0.0));
        let p = Vector3::new(1.0, 1.0, 1.0);
        let composed = a.compose(&b).transform_point(&p);
        let sequential = a.transform_point(&b.transform_point(&p));
        assert!((composed - sequential).norm() < 1e-12);
    }
}
