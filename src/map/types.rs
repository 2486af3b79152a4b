//! Core ID and descriptor types for the map structures.

use serde::{Deserialize, Serialize};

/// Unique identifier for a keyframe within a map.
///
/// Ids are assigned sequentially and serve as lightweight handles for
/// cross-referencing without Arc/Rc, which keeps ownership simple and
/// avoids cyclic references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyFrameId(pub u32);

impl std::fmt::Display for KeyFrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KF{}", self.0)
    }
}

/// Unique identifier for a cloud point within a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub u32);

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CP{}", self.0)
    }
}

/// 256-bit binary feature descriptor (ORB-like), compared by Hamming distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor(pub [u8; 32]);

impl Descriptor {
    /// Hamming distance to another descriptor.
    pub fn distance(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self([0u8; 32])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ordering_and_display() {
        assert!(KeyFrameId(1) < KeyFrameId(2));
        assert_eq!(format!("{}", KeyFrameId(7)), "KF7");
        assert_eq!(format!("{}", PointId(123)), "CP123");
    }

    #[test]
    fn hamming_distance() {
        let a = Descriptor([0u8; 32]);
        let mut bytes = [0u8; 32];
        bytes[0] = 0b1010_1010;
        let b = Descriptor(bytes);
        assert_eq!(a.distance(&b), 4);
        assert_eq!(b.distance(&b), 0);
    }
}
