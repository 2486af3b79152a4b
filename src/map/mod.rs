//! Map data model: point cloud, keyframes, coordinate system.
//!
//! A `Map` is the unit of exchange in the pipeline: producers submit locally
//! built maps and the merge worker folds them into the single global map.
//! Ownership is transferred, not shared; readers get clones taken under the
//! map lock.

pub mod camera;
pub mod cloud_point;
pub mod coordinate_system;
pub mod frame;
pub mod keyframe;
#[allow(clippy::module_inception)]
pub mod map;
pub mod types;

pub use camera::CameraParameters;
pub use cloud_point::{CloudPoint, PointCloud};
pub use coordinate_system::CoordinateSystem;
pub use frame::Frame;
pub use keyframe::{KeyFrame, KeyFrameCollection};
pub use map::Map;
pub use types::{Descriptor, KeyFrameId, PointId};
