//! File-backed map store.
//!
//! Persists the global map as a single bincode snapshot. The pipeline calls
//! every method under its map lock, so the store itself stays lock-free.

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

use crate::api::MapStore;
use crate::geometry::Sim3;
use crate::map::{CoordinateSystem, KeyFrame, KeyFrameId, Map};

/// Map store persisting to a single snapshot file.
pub struct FileMapStore {
    path: PathBuf,
    map: Map,
}

impl FileMapStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            map: Map::new(),
        }
    }
}

impl MapStore for FileMapStore {
    fn load(&mut self) -> anyhow::Result<()> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("reading map snapshot {}", self.path.display()))?;
        self.map = bincode::deserialize(&bytes)
            .with_context(|| format!("decoding map snapshot {}", self.path.display()))?;
        debug!(
            points = self.map.num_points(),
            keyframes = self.map.num_keyframes(),
            "loaded map snapshot"
        );
        Ok(())
    }

    fn get(&self) -> Map {
        self.map.clone()
    }

    fn set(&mut self, map: Map) {
        self.map = map;
    }

    fn save(&self) -> anyhow::Result<()> {
        let bytes = bincode::serialize(&self.map).context("encoding map snapshot")?;
        std::fs::write(&self.path, bytes)
            .with_context(|| format!("writing map snapshot {}", self.path.display()))?;
        debug!(
            points = self.map.num_points(),
            keyframes = self.map.num_keyframes(),
            "saved map snapshot"
        );
        Ok(())
    }

    fn delete(&mut self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("deleting map snapshot {}", self.path.display())
                });
            }
        }
        self.map = Map::new();
        Ok(())
    }

    fn point_cloud_pruning(&mut self) -> usize {
        // Points nothing observes carry no constraint; drop them.
        let live_kfs: Vec<KeyFrameId> = self.map.keyframes().ids().collect();
        let doomed: Vec<_> = self
            .map
            .point_cloud()
            .iter()
            .filter(|p| !p.observations.keys().any(|kf| live_kfs.binary_search(kf).is_ok()))
            .map(|p| p.id)
            .collect();
        for id in &doomed {
            self.map.point_cloud_mut().remove(*id);
            for kf in self.map.keyframes_mut().iter_mut() {
                kf.observed_points.remove(id);
            }
        }
        doomed.len()
    }

    fn keyframe_pruning(&mut self) -> usize {
        // Keyframes observing no live point contribute nothing to the map.
        let doomed: Vec<KeyFrameId> = self
            .map
            .keyframes()
            .iter()
            .filter(|kf| {
                !kf.observed_points
                    .iter()
                    .any(|pt| self.map.point_cloud().contains(*pt))
            })
            .map(|kf| kf.id)
            .collect();
        for id in &doomed {
            self.map.keyframes_mut().remove(*id);
            for point in self.map.point_cloud_mut().iter_mut() {
                point.observations.remove(id);
            }
        }
        doomed.len()
    }

    fn submap(&self, anchor: KeyFrameId, count: usize) -> Option<Map> {
        if !self.map.keyframes().contains(anchor) || count == 0 {
            return None;
        }

        // Window of `count` keyframes centered on the anchor, in id order.
        let ids: Vec<KeyFrameId> = self.map.keyframes().ids().collect();
        let anchor_pos = ids.iter().position(|id| *id == anchor)?;
        let half = count / 2;
        let start = anchor_pos.saturating_sub(half);
        let end = (start + count).min(ids.len());
        let start = end.saturating_sub(count);
        let window = &ids[start..end];

        let mut submap = Map::new();
        // The submap lives in the global frame.
        *submap.coordinate_system_mut() = CoordinateSystem::fixed(Sim3::identity());

        for id in window {
            let kf = self.map.keyframes().get(*id)?;
            submap.keyframes_mut().insert_keyframe(KeyFrame {
                observed_points: Default::default(),
                ..kf.clone()
            });
        }
        for point in self.map.point_cloud().iter() {
            let observed: Vec<_> = point
                .observations
                .iter()
                .filter(|(kf, _)| window.contains(kf))
                .map(|(kf, px)| (*kf, *px))
                .collect();
            if observed.is_empty() {
                continue;
            }
            submap.point_cloud_mut().insert_point(point.clone());
            if let Some(p) = submap.point_cloud_mut().get_mut(point.id) {
                p.observations = observed.iter().copied().collect();
            }
            for (kf, _) in observed {
                if let Some(kf) = submap.keyframes_mut().get_mut(kf) {
                    kf.observed_points.insert(point.id);
                }
            }
        }
        Some(submap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SE3;
    use crate::map::Descriptor;
    use nalgebra::{Vector2, Vector3};

    fn sample_map(num_kfs: u32) -> Map {
        let mut map = Map::new();
        for i in 0..num_kfs {
            let kf = map.add_keyframe(
                SE3::from_translation(Vector3::new(i as f64, 0.0, 0.0)),
                vec![],
            );
            let pt = map.add_point(Vector3::new(i as f64, 0.0, 5.0), Descriptor::default());
            map.add_observation(kf, pt, Vector2::new(320.0, 240.0));
        }
        map
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.bin");
        let mut store = FileMapStore::new(&path);
        store.set(sample_map(4));
        store.save().unwrap();

        let mut fresh = FileMapStore::new(&path);
        fresh.load().unwrap();
        assert_eq!(fresh.get(), store.get());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileMapStore::new(dir.path().join("absent.bin"));
        assert!(store.load().is_err());
    }

    #[test]
    fn delete_clears_map_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.bin");
        let mut store = FileMapStore::new(&path);
        store.set(sample_map(2));
        store.save().unwrap();

        store.delete().unwrap();
        assert!(store.get().is_empty());
        assert!(!path.exists());
        // second delete is a no-op
        store.delete().unwrap();
    }

    #[test]
    fn pruning_removes_unobserved_points_and_empty_keyframes() {
        let mut map = sample_map(3);
        // one point nobody observes, one keyframe observing nothing
        map.add_point(Vector3::new(9.0, 9.0, 9.0), Descriptor::default());
        map.add_keyframe(SE3::identity(), vec![]);

        let dir = tempfile::tempdir().unwrap();
        let mut store = FileMapStore::new(dir.path().join("map.bin"));
        store.set(map);
        assert_eq!(store.point_cloud_pruning(), 1);
        assert_eq!(store.keyframe_pruning(), 1);
        assert_eq!(store.get().num_points(), 3);
        assert_eq!(store.get().num_keyframes(), 3);
    }

    #[test]
    fn submap_windows_around_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileMapStore::new(dir.path().join("map.bin"));
        store.set(sample_map(10));

        let anchor = KeyFrameId(5);
        let sub = store.submap(anchor, 4).unwrap();
        assert_eq!(sub.num_keyframes(), 4);
        assert!(sub.keyframes().contains(anchor));
        assert!(!sub.coordinate_system().is_floating());
        // every submap point is observed by a windowed keyframe
        for point in sub.point_cloud().iter() {
            assert!(point.observations.keys().all(|kf| sub.keyframes().contains(*kf)));
        }
    }

    #[test]
    fn submap_clamps_at_collection_edges() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileMapStore::new(dir.path().join("map.bin"));
        store.set(sample_map(3));
        let sub = store.submap(KeyFrameId(0), 100).unwrap();
        assert_eq!(sub.num_keyframes(), 3);
        assert!(store.submap(KeyFrameId(42), 4).is_none());
    }
}
