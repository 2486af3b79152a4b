//! Asynchronous map-update pipeline for a visual SLAM mapping service.
//!
//! Producers submit locally built 3D maps; a single background worker merges
//! each into a persistent global map; consumers read the full map or a
//! keyframe-localized submap. See `pipeline::MapUpdatePipeline` for the
//! public surface.

pub mod api;
pub mod config;
pub mod error;
pub mod geometry;
pub mod map;
pub mod pipeline;
pub mod retrieval;
pub mod solver;
pub mod storage;

pub use config::{OverflowPolicy, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{MapUpdatePipeline, MergeComponents};
