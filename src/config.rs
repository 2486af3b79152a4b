//! Pipeline configuration and log-level plumbing.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Ingress queue overflow policy.
///
/// Submissions never block the caller: when the queue is full, one entry is
/// dropped according to this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the oldest queued map to make room (keeps fresh submissions).
    #[default]
    DropOldest,
    /// Drop the incoming map.
    DropNewest,
}

/// Tunable pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of keyframes returned around the best match of a submap query.
    pub submap_keyframe_count: usize,
    /// Bundle-adjustment residual above which a merge is discarded.
    pub residual_error_threshold: f64,
    /// Ingress queue capacity.
    pub queue_capacity: usize,
    /// What to drop when the ingress queue is full.
    pub overflow_policy: OverflowPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            submap_keyframe_count: 100,
            residual_error_threshold: 10.0,
            queue_capacity: 16,
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// Resolve the log level from the `SOLAR_LOG_LEVEL` environment variable.
///
/// Accepted values: DEBUG, CRITICAL, ERROR, INFO, TRACE, WARNING. An invalid
/// value logs an error and keeps the INFO default. CRITICAL maps to ERROR
/// (tracing has no critical level).
pub fn log_level_from_env() -> LevelFilter {
    let Ok(value) = std::env::var("SOLAR_LOG_LEVEL") else {
        return LevelFilter::INFO;
    };
    match value.as_str() {
        "DEBUG" => LevelFilter::DEBUG,
        "CRITICAL" | "ERROR" => LevelFilter::ERROR,
        "INFO" => LevelFilter::INFO,
        "TRACE" => LevelFilter::TRACE,
        "WARNING" => LevelFilter::WARN,
        other => {
            tracing::error!(
                value = other,
                "invalid SOLAR_LOG_LEVEL, expected DEBUG, CRITICAL, ERROR, INFO, TRACE \
                 or WARNING; keeping INFO"
            );
            LevelFilter::INFO
        }
    }
}
