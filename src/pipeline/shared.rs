//! Shared state between the facade and the merge worker.
//!
//! One exclusive lock (the "map lock") guards the map store, the in-memory
//! global map, and the empty flag together: every load, get, set, save,
//! delete and submap extraction happens under it. Lifecycle flags are plain
//! atomics with helper methods.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::api::MapStore;
use crate::map::{CameraParameters, Map};

/// Everything the map lock protects.
pub struct GlobalMapState {
    /// Durable storage; the source of truth for the global map.
    pub store: Box<dyn MapStore>,
    /// In-memory snapshot of the current global map.
    pub map: Map,
    /// Set at init when the store holds nothing, and after a reset; cleared
    /// when a bootstrap merge installs the first map.
    pub empty: bool,
}

/// State shared by the facade and the merge worker.
pub struct SharedState {
    /// The global map, its store, and the empty flag, behind the map lock.
    pub map_state: Mutex<GlobalMapState>,

    /// Camera parameters; required before the pipeline can start.
    pub camera: RwLock<Option<CameraParameters>>,

    /// Set once `init()` has completed.
    initialized: AtomicBool,

    /// True between `start()` and `stop()`.
    running: AtomicBool,

    /// Request the worker thread to finish and exit.
    shutdown_requested: AtomicBool,
}

impl SharedState {
    pub fn new(store: Box<dyn MapStore>) -> Arc<Self> {
        Arc::new(Self {
            map_state: Mutex::new(GlobalMapState {
                store,
                map: Map::new(),
                empty: true,
            }),
            camera: RwLock::new(None),
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Mark initialization done. Returns false if it already was (idempotent
    /// `init()` support).
    pub fn mark_initialized(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::SeqCst);
    }

    pub fn has_camera_parameters(&self) -> bool {
        self.camera.read().is_some()
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}
