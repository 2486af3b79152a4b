//! Pipeline error taxonomy.
//!
//! Only facade-level failures reach callers. Merge failures inside the
//! worker (no overlap, fusion failure, residual over threshold) are
//! terminal-per-map: the submitted map is dropped, the outcome is logged,
//! and nothing is propagated back to the submitter.

use thiserror::Error;

/// Errors surfaced by the pipeline facade.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Operation invoked out of lifecycle order.
    #[error("invalid pipeline state: {0}")]
    InvalidState(&'static str),

    /// Map store load/save/delete failure.
    #[error("map storage failed: {0}")]
    StorageFailed(String),

    /// No keyframe matched a submap query.
    #[error("keyframe retrieval failed: {0}")]
    RetrievalFailed(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
