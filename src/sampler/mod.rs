//! Utilization sampler: the sole writer of a run's series sink.
//!
//! The sampler runs on its own thread for a bounded wall-clock duration, writing the
//! header once and then one flushed row per sample interval. A stop raised while a
//! capture is in flight abandons that capture, so no row is ever written after the
//! stop. Sink failures end the sampler and are reported in its [`SamplerReport`];
//! they never reach the sweep.

pub mod source;

use serde::Serialize;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::error::{HarnessError, Result};
use crate::reliability::{join_with_timeout, StopSignal};
use crate::series::SeriesWriter;
use crate::types::{unix_timestamp, UtilizationSample};

pub use source::{SysinfoSource, UtilizationSource};

/// Outcome of a sampler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SamplerReport {
    pub samples_written: u64,
    /// Sink failure that ended the run early, if any
    pub error: Option<String>,
}

/// Sampler run parameters.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub output_path: PathBuf,
    pub duration: Duration,
    pub interval: Duration,
}

/// Handle to a running sampler thread.
pub struct SamplerHandle {
    stop: StopSignal,
    thread: Option<JoinHandle<SamplerReport>>,
}

impl SamplerHandle {
    /// Start sampling `source` into a fresh sink on a new thread named `sampler`.
    pub fn spawn(settings: SamplerSettings, source: Box<dyn UtilizationSource>) -> Result<Self> {
        let stop = StopSignal::new();
        let worker_stop = stop.clone();

        let thread = thread::Builder::new()
            .name("sampler".to_string())
            .spawn(move || run_sampler(settings, source, worker_stop))
            .map_err(|source| HarnessError::Spawn {
                unit: "sampler",
                source,
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop sampling and wait up to `timeout` for the thread.
    ///
    /// Safe to call repeatedly; only the first call returns a report.
    pub fn stop(&mut self, timeout: Duration) -> Option<SamplerReport> {
        self.stop.trigger();
        let handle = self.thread.take()?;
        join_with_timeout(handle, timeout, "sampler")
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.stop.trigger();
    }
}

fn run_sampler(
    settings: SamplerSettings,
    mut source: Box<dyn UtilizationSource>,
    stop: StopSignal,
) -> SamplerReport {
    let mut report = SamplerReport::default();

    let mut sink = match SeriesWriter::create(&settings.output_path) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Sampler cannot open its sink: {}", e);
            report.error = Some(e.to_string());
            return report;
        }
    };

    info!(
        "Sampling {} cores every {:?} for {:?} into {:?}",
        source.core_count(),
        settings.interval,
        settings.duration,
        settings.output_path
    );

    let deadline = Instant::now() + settings.duration;
    while Instant::now() < deadline && !stop.is_stopped() {
        let Some(per_core) = source.sample(settings.interval, &stop) else {
            break;
        };
        if stop.is_stopped() {
            break;
        }

        let sample = UtilizationSample::new(unix_timestamp(), per_core);
        if let Err(e) = sink.append(&sample) {
            error!("Sampler stopped: {}", e);
            report.error = Some(e.to_string());
            break;
        }
        report.samples_written = sink.samples_written();
    }

    debug!("Sampler finished with {} samples", report.samples_written);
    report
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Source that blocks for the interval and reports a constant vector.
    pub struct FixedSource {
        pub per_core: Vec<f64>,
    }

    impl UtilizationSource for FixedSource {
        fn core_count(&self) -> usize {
            self.per_core.len()
        }

        fn sample(&mut self, interval: Duration, stop: &StopSignal) -> Option<Vec<f64>> {
            if stop.wait_timeout(interval) {
                return None;
            }
            Some(self.per_core.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedSource;
    use super::*;
    use crate::series::{load_series, read_series};
    use tempfile::tempdir;

    fn settings(path: PathBuf, duration_ms: u64, interval_ms: u64) -> SamplerSettings {
        SamplerSettings {
            output_path: path,
            duration: Duration::from_millis(duration_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn test_sample_count_tracks_duration_over_interval() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cpu_usage.csv");
        let source = FixedSource {
            per_core: vec![1.0, 2.0, 3.0, 4.0],
        };

        let mut sampler =
            SamplerHandle::spawn(settings(path.clone(), 500, 100), Box::new(source)).unwrap();
        thread::sleep(Duration::from_millis(800));
        let report = sampler.stop(Duration::from_secs(2)).unwrap();

        assert!(report.error.is_none());
        assert!(
            (4..=6).contains(&report.samples_written),
            "samples: {}",
            report.samples_written
        );

        let series = load_series(&path).unwrap();
        assert_eq!(series.len() as u64, report.samples_written);
        assert!(series.samples().iter().all(|s| s.per_core.len() == 4));
        assert!(series
            .timestamps()
            .windows(2)
            .all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_stop_interrupts_and_writes_nothing_more() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cpu_usage.csv");
        let source = FixedSource {
            per_core: vec![50.0, 50.0],
        };

        let mut sampler =
            SamplerHandle::spawn(settings(path.clone(), 60_000, 50), Box::new(source)).unwrap();
        thread::sleep(Duration::from_millis(180));

        let started = Instant::now();
        let report = sampler.stop(Duration::from_secs(2)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!sampler.is_running());

        let before = std::fs::read_to_string(&path).unwrap();
        assert!(sampler.stop(Duration::from_secs(1)).is_none());
        thread::sleep(Duration::from_millis(150));
        let after = std::fs::read_to_string(&path).unwrap();

        assert_eq!(before, after);
        let series = read_series(before.as_bytes()).unwrap();
        assert_eq!(series.len() as u64, report.samples_written);
    }

    #[test]
    fn test_unwritable_sink_is_reported_not_propagated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("cpu_usage.csv");
        let source = FixedSource {
            per_core: vec![0.0],
        };

        let mut sampler =
            SamplerHandle::spawn(settings(path, 1_000, 10), Box::new(source)).unwrap();
        let report = sampler.stop(Duration::from_secs(2)).unwrap();

        assert_eq!(report.samples_written, 0);
        assert!(report.error.unwrap().contains("write failed"));
    }

    /// Reports full vectors for a while, then one core fewer.
    struct ShrinkingSource {
        per_core: Vec<f64>,
        full_samples: usize,
    }

    impl UtilizationSource for ShrinkingSource {
        fn core_count(&self) -> usize {
            self.per_core.len()
        }

        fn sample(&mut self, interval: Duration, stop: &StopSignal) -> Option<Vec<f64>> {
            if stop.wait_timeout(interval) {
                return None;
            }
            if self.full_samples == 0 {
                return Some(self.per_core[1..].to_vec());
            }
            self.full_samples -= 1;
            Some(self.per_core.clone())
        }
    }

    #[test]
    fn test_append_failure_mid_run_keeps_written_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cpu_usage.csv");
        let source = ShrinkingSource {
            per_core: vec![10.0, 20.0, 30.0],
            full_samples: 3,
        };

        let mut sampler =
            SamplerHandle::spawn(settings(path.clone(), 60_000, 20), Box::new(source)).unwrap();
        let started = Instant::now();
        while sampler.is_running() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!sampler.is_running());
        let report = sampler.stop(Duration::from_secs(1)).unwrap();

        assert_eq!(report.samples_written, 3);
        assert!(report.error.unwrap().contains("per-core values"));

        let series = load_series(&path).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.core_count(), 3);
    }
}
