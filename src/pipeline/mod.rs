//! The asynchronous map-update pipeline.
//!
//! `MapUpdatePipeline` is the public surface: lifecycle control plus
//! submit/get/reset operations. Submitted maps flow through the ingress
//! queue to a single background merge worker that folds them into the
//! persistent global map.

pub mod facade;
pub mod queue;
pub mod shared;
pub mod worker;

pub use facade::{MapUpdatePipeline, MergeComponents};
pub use queue::IngressQueue;
pub use shared::SharedState;
