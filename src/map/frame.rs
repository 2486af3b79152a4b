//! Query frame for submap requests.

use serde::{Deserialize, Serialize};

use crate::geometry::SE3;

use super::types::Descriptor;

/// A single captured frame used to query the global map for a submap.
///
/// Carries only what keyframe retrieval needs: the feature descriptors and,
/// when available, a pose prior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    pub descriptors: Vec<Descriptor>,
    pub pose: Option<SE3>,
}

impl Frame {
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self {
            descriptors,
            pose: None,
        }
    }
}
