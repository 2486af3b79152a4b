//! Coordinate system attached to a map.

use serde::{Deserialize, Serialize};

use crate::geometry::Sim3;

/// Relation of a map's frame to the global reference frame.
///
/// A floating coordinate system has no known relation yet; overlap detection
/// establishes one. Once fixed, the parent transform is authoritative and is
/// never recomputed by overlap detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    parent_transform: Option<Sim3>,
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self::floating()
    }
}

impl CoordinateSystem {
    /// A floating coordinate system (no fixed relation to the global frame).
    pub fn floating() -> Self {
        Self {
            parent_transform: None,
        }
    }

    /// A coordinate system fixed to the global frame by `transform`.
    pub fn fixed(transform: Sim3) -> Self {
        Self {
            parent_transform: Some(transform),
        }
    }

    pub fn is_floating(&self) -> bool {
        self.parent_transform.is_none()
    }

    pub fn parent_transform(&self) -> Option<&Sim3> {
        self.parent_transform.as_ref()
    }

    /// Fix this coordinate system to the given transform.
    pub fn set_parent_transform(&mut self, transform: Sim3) {
        self.parent_transform = Some(transform);
    }
}
