//! Bag-of-words keyframe retrieval.
//!
//! A very small place-recognition scheme: descriptors are quantized into a
//! sparse word histogram and keyframes are scored by dot product against the
//! query frame's histogram. The quantizer is intentionally simple and can be
//! upgraded (e.g. to a trained vocabulary) without touching the pipeline.

use std::collections::HashMap;

use crate::api::KeyframeRetriever;
use crate::map::{Descriptor, Frame, KeyFrameId, Map};

/// Bag-of-words vector: word_id -> weight.
pub type BowVector = HashMap<u32, f64>;

/// Maximum number of candidates returned for a query.
const MAX_CANDIDATES: usize = 5;

/// Quantize one descriptor to a visual word.
///
/// The leading descriptor bytes are the coarse pattern bits, which is enough
/// discrimination for a 64k-word codebook.
fn quantize(descriptor: &Descriptor) -> u32 {
    ((descriptor.0[0] as u32) << 8) | descriptor.0[1] as u32
}

/// Build a normalized BoW histogram from a descriptor set.
fn bow_vector(descriptors: &[Descriptor]) -> BowVector {
    let mut bow = BowVector::new();
    for d in descriptors {
        *bow.entry(quantize(d)).or_insert(0.0) += 1.0;
    }
    let norm: f64 = bow.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for w in bow.values_mut() {
            *w /= norm;
        }
    }
    bow
}

/// Sparse dot product between two histograms.
fn score(a: &BowVector, b: &BowVector) -> f64 {
    a.iter()
        .filter_map(|(word, w)| b.get(word).map(|v| w * v))
        .sum()
}

/// BoW-based keyframe retriever.
pub struct BowRetriever {
    max_candidates: usize,
}

impl BowRetriever {
    pub fn new() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
        }
    }
}

impl Default for BowRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyframeRetriever for BowRetriever {
    fn retrieve(&self, frame: &Frame, map: &Map) -> Vec<KeyFrameId> {
        let query = bow_vector(&frame.descriptors);
        if query.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<(KeyFrameId, f64)> = map
            .keyframes()
            .iter()
            .map(|kf| (kf.id, score(&query, &bow_vector(&kf.descriptors))))
            .filter(|(_, s)| *s > 0.0)
            .collect();

        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(self.max_candidates);
        candidates.into_iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SE3;

    fn descriptor(word: u16) -> Descriptor {
        let mut bytes = [0u8; 32];
        bytes[0] = (word >> 8) as u8;
        bytes[1] = (word & 0xff) as u8;
        Descriptor(bytes)
    }

    #[test]
    fn retrieves_matching_keyframe_first() {
        let mut map = Map::new();
        let kf_a = map.add_keyframe(SE3::identity(), vec![descriptor(1), descriptor(2)]);
        let _kf_b = map.add_keyframe(SE3::identity(), vec![descriptor(100), descriptor(101)]);

        let frame = Frame::new(vec![descriptor(1), descriptor(2)]);
        let result = BowRetriever::new().retrieve(&frame, &map);
        assert_eq!(result.first(), Some(&kf_a));
    }

    #[test]
    fn no_candidates_for_unseen_words() {
        let mut map = Map::new();
        map.add_keyframe(SE3::identity(), vec![descriptor(1)]);
        let frame = Frame::new(vec![descriptor(999)]);
        assert!(BowRetriever::new().retrieve(&frame, &map).is_empty());
    }

    #[test]
    fn empty_frame_yields_nothing() {
        let mut map = Map::new();
        map.add_keyframe(SE3::identity(), vec![descriptor(1)]);
        assert!(BowRetriever::new()
            .retrieve(&Frame::default(), &map)
            .is_empty());
    }
}
