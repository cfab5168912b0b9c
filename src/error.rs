//! Custom error types for core-sweep.
//!
//! This module provides a centralized error handling system using the `thiserror` crate.
//! Most variants are local to one unit of a run (a single sweep iteration, the sampler
//! thread, the analyzer) and are reported rather than propagated; only failure to start
//! a unit is fatal to a whole run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Invalid configuration or an unresolvable core count.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The platform refused to pin the workload to a core.
    #[error("Failed to pin workload to core {core}: {reason}")]
    Affinity { core: usize, reason: String },

    /// The series sink could not be created or written.
    #[error("Series sink {path:?} write failed: {source}")]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The series sink holds a header but no samples.
    #[error("Series {0:?} contains no samples")]
    EmptySeries(PathBuf),

    /// A series row could not be decoded.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// A sample disagrees with the core count fixed for the run.
    #[error("Sample has {actual} per-core values, series expects {expected}")]
    CoreCountMismatch { expected: usize, actual: usize },

    /// A concurrent unit could not be started.
    #[error("Failed to start {unit}: {source}")]
    Spawn {
        unit: &'static str,
        #[source]
        source: io::Error,
    },

    /// Invalid benchmark parameters.
    #[error("Benchmark error: {0}")]
    Benchmark(String),

    /// Errors from the underlying IO system.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// CSV encoding/decoding errors outside the sampler's sink.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization errors for reports.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Whether the error ends a whole run rather than one unit or iteration.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, HarnessError::Spawn { .. })
    }
}

/// Convenience type alias for Results with HarnessError.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add context to the error, reported as a configuration problem.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| HarnessError::Configuration(format!("{}: {}", f(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_spawn_is_run_fatal() {
        let spawn = HarnessError::Spawn {
            unit: "sampler",
            source: io::Error::new(io::ErrorKind::Other, "no threads"),
        };
        assert!(spawn.is_run_fatal());

        let affinity = HarnessError::Affinity {
            core: 99,
            reason: "out of range".to_string(),
        };
        assert!(!affinity.is_run_fatal());
        assert!(!HarnessError::EmptySeries(PathBuf::from("x.csv")).is_run_fatal());
    }

    #[test]
    fn test_with_context_wraps_message() {
        let parsed: std::result::Result<u32, _> = "abc".parse::<u32>();
        let err = parsed.with_context(|| "parsing dwell".to_string()).unwrap_err();
        assert!(err.to_string().contains("parsing dwell"));
    }
}
