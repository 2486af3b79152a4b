//! Camera intrinsic parameters.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Intrinsic calibration of the capturing device.
///
/// Must be set on the pipeline before `start()`: the bundler and the
/// registration engine both depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParameters {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
    /// Radial/tangential distortion coefficients (k1, k2, p1, p2, k3).
    pub distortion: [f64; 5],
}

impl CameraParameters {
    /// Project a point in camera frame to pixel coordinates.
    ///
    /// Returns `None` if the point is behind the camera. Distortion is not
    /// applied; the stored maps carry undistorted measurements.
    pub fn project(&self, p_cam: &Vector3<f64>) -> Option<Vector2<f64>> {
        if p_cam.z <= 1e-9 {
            return None;
        }
        Some(Vector2::new(
            self.fx * p_cam.x / p_cam.z + self.cx,
            self.fy * p_cam.y / p_cam.z + self.cy,
        ))
    }
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            fx: 525.0,
            fy: 525.0,
            cx: 320.0,
            cy: 240.0,
            width: 640,
            height: 480,
            distortion: [0.0; 5],
        }
    }
}
