//! Per-core utilization sampling primitive.

use std::time::Duration;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::reliability::StopSignal;

/// Capability returning one utilization percentage per logical core.
pub trait UtilizationSource: Send {
    /// Number of per-core values every sample carries.
    fn core_count(&self) -> usize;

    /// Block for `interval` and return per-core utilization averaged over it.
    ///
    /// Returns `None` if `stop` is raised before the interval completes; the partial
    /// capture is discarded.
    fn sample(&mut self, interval: Duration, stop: &StopSignal) -> Option<Vec<f64>>;
}

/// [`UtilizationSource`] backed by `sysinfo`.
///
/// Utilization is the busy share of each core between a refresh at the start of the
/// interval and one at its end. Intervals shorter than sysinfo's minimum update
/// interval are stretched to that minimum.
pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self { system }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UtilizationSource for SysinfoSource {
    fn core_count(&self) -> usize {
        self.system.cpus().len()
    }

    fn sample(&mut self, interval: Duration, stop: &StopSignal) -> Option<Vec<f64>> {
        self.system.refresh_cpu_usage();
        if stop.wait_timeout(interval.max(MINIMUM_CPU_UPDATE_INTERVAL)) {
            return None;
        }
        self.system.refresh_cpu_usage();

        Some(
            self.system
                .cpus()
                .iter()
                .map(|cpu| round_percent(cpu.cpu_usage() as f64))
                .collect(),
        )
    }
}

/// Round to one decimal place.
fn round_percent(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(12.345), 12.3);
        assert_eq!(round_percent(99.96), 100.0);
        assert_eq!(round_percent(0.0), 0.0);
    }

    #[test]
    fn test_sysinfo_sample_has_one_value_per_core() {
        let mut source = SysinfoSource::new();
        let stop = StopSignal::new();

        let sample = source
            .sample(MINIMUM_CPU_UPDATE_INTERVAL, &stop)
            .expect("sample without stop");
        assert_eq!(sample.len(), source.core_count());
        assert!(sample.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[test]
    fn test_stopped_source_returns_none() {
        let mut source = SysinfoSource::new();
        let stop = StopSignal::new();
        stop.trigger();
        assert!(source.sample(Duration::from_secs(5), &stop).is_none());
    }
}
