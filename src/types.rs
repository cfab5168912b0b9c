//! Core data types shared by the sampler, scheduler and analyzer.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock instant as fractional seconds since the UNIX epoch.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// One per-core utilization capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSample {
    /// Capture instant, seconds since the UNIX epoch.
    pub timestamp: f64,
    /// Utilization percentage per logical core, indexed by core.
    pub per_core: Vec<f64>,
}

impl UtilizationSample {
    pub fn new(timestamp: f64, per_core: Vec<f64>) -> Self {
        Self { timestamp, per_core }
    }

    pub fn core_count(&self) -> usize {
        self.per_core.len()
    }
}

/// The instant the workload was pinned to a core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwitchEvent {
    pub timestamp: f64,
    pub core_index: usize,
}

impl SwitchEvent {
    /// Record a switch to `core_index` at the current instant.
    pub fn now(core_index: usize) -> Self {
        Self {
            timestamp: unix_timestamp(),
            core_index,
        }
    }
}

/// Ordered, append-only sequence of samples for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    samples: Vec<UtilizationSample>,
}

impl Series {
    pub fn new(samples: Vec<UtilizationSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[UtilizationSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Core count of the run, taken from the first sample.
    pub fn core_count(&self) -> usize {
        self.samples.first().map(|s| s.core_count()).unwrap_or(0)
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    /// Per-core columns: `columns[core][sample]`.
    pub fn per_core_columns(&self) -> Vec<Vec<f64>> {
        let cores = self.core_count();
        let mut columns = vec![Vec::with_capacity(self.samples.len()); cores];
        for sample in &self.samples {
            for (core, value) in sample.per_core.iter().take(cores).enumerate() {
                columns[core].push(*value);
            }
        }
        columns
    }

    /// Time span covered by the series, if it has any samples.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let first = self.samples.first()?.timestamp;
        let last = self.samples.last()?.timestamp;
        Some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_core_columns_transpose() {
        let series = Series::new(vec![
            UtilizationSample::new(1.0, vec![10.0, 90.0]),
            UtilizationSample::new(2.0, vec![20.0, 80.0]),
            UtilizationSample::new(3.0, vec![30.0, 70.0]),
        ]);

        let columns = series.per_core_columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], vec![10.0, 20.0, 30.0]);
        assert_eq!(columns[1], vec![90.0, 80.0, 70.0]);
        assert_eq!(series.time_range(), Some((1.0, 3.0)));
    }

    #[test]
    fn test_empty_series() {
        let series = Series::default();
        assert!(series.is_empty());
        assert_eq!(series.core_count(), 0);
        assert!(series.per_core_columns().is_empty());
        assert_eq!(series.time_range(), None);
    }

    #[test]
    fn test_switch_event_now_is_recent() {
        let before = unix_timestamp();
        let event = SwitchEvent::now(3);
        assert_eq!(event.core_index, 3);
        assert!(event.timestamp >= before);
    }
}
