//! Keyframes and the keyframe collection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::geometry::SE3;

use super::types::{Descriptor, KeyFrameId, PointId};

/// A keyframe: a pose, its feature descriptors, and the points it observes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    pub id: KeyFrameId,
    /// Camera-to-world pose (T_wc).
    pub pose: SE3,
    pub descriptors: Vec<Descriptor>,
    /// Ids of cloud points observed by this keyframe.
    pub observed_points: BTreeSet<PointId>,
}

impl KeyFrame {
    pub fn new(id: KeyFrameId, pose: SE3, descriptors: Vec<Descriptor>) -> Self {
        Self {
            id,
            pose,
            descriptors,
            observed_points: BTreeSet::new(),
        }
    }
}

/// Collection of keyframes, ordered by identifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyFrameCollection {
    keyframes: BTreeMap<KeyFrameId, KeyFrame>,
    next_id: u32,
}

impl KeyFrameCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Add a keyframe with a freshly assigned id; returns the id.
    pub fn add_keyframe(&mut self, pose: SE3, descriptors: Vec<Descriptor>) -> KeyFrameId {
        let id = KeyFrameId(self.next_id);
        self.next_id += 1;
        self.keyframes.insert(id, KeyFrame::new(id, pose, descriptors));
        id
    }

    /// Insert a fully-formed keyframe, keeping its id.
    pub fn insert_keyframe(&mut self, kf: KeyFrame) {
        self.next_id = self.next_id.max(kf.id.0 + 1);
        self.keyframes.insert(kf.id, kf);
    }

    pub fn get(&self, id: KeyFrameId) -> Option<&KeyFrame> {
        self.keyframes.get(&id)
    }

    pub fn get_mut(&mut self, id: KeyFrameId) -> Option<&mut KeyFrame> {
        self.keyframes.get_mut(&id)
    }

    pub fn remove(&mut self, id: KeyFrameId) -> Option<KeyFrame> {
        self.keyframes.remove(&id)
    }

    pub fn contains(&self, id: KeyFrameId) -> bool {
        self.keyframes.contains_key(&id)
    }

    /// Keyframes in id order (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &KeyFrame> {
        self.keyframes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut KeyFrame> {
        self.keyframes.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = KeyFrameId> + '_ {
        self.keyframes.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframes_iterate_in_id_order() {
        let mut kfs = KeyFrameCollection::new();
        kfs.insert_keyframe(KeyFrame::new(KeyFrameId(5), SE3::identity(), vec![]));
        kfs.insert_keyframe(KeyFrame::new(KeyFrameId(2), SE3::identity(), vec![]));
        kfs.insert_keyframe(KeyFrame::new(KeyFrameId(9), SE3::identity(), vec![]));
        let order: Vec<u32> = kfs.ids().map(|id| id.0).collect();
        assert_eq!(order, vec![2, 5, 9]);
    }
}
