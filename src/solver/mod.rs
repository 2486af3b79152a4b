//! Reference implementations of the geometric collaborators.
//!
//! These honor the contracts in `api`; the pipeline core never depends on
//! their internals and alternative engines can be wired in their place.

pub mod align;
pub mod bundler;
pub mod fusion;
pub mod overlap;
pub mod updater;

pub use bundler::ReprojectionBundler;
pub use fusion::TransformMapFusion;
pub use overlap::DescriptorOverlapDetector;
pub use updater::CovisibilityUpdater;
