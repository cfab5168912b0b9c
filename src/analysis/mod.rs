//! Post-run analysis of a recorded series.
//!
//! Splits the series into dwell windows, one per switch event, and reports each
//! core's mean utilization inside every window. A window whose busiest core is the
//! core the workload was pinned to shows the load followed the pin.

pub mod render;

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::series::load_series;
use crate::types::{Series, SwitchEvent};

pub use render::{Renderer, TextRenderer};

/// Mean utilization per core while the workload dwelt on `core_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DwellWindow {
    pub core_index: usize,
    pub start: f64,
    pub end: f64,
    /// Samples captured inside `[start, end)`
    pub samples: usize,
    /// Empty when no sample fell inside the window
    pub per_core_mean: Vec<f64>,
    pub busiest_core: Option<usize>,
}

impl DwellWindow {
    /// Whether the pinned core was the busiest one in this window.
    pub fn followed_pin(&self) -> bool {
        self.busiest_core == Some(self.core_index)
    }
}

/// A loaded series plus its dwell windows.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub series: Series,
    pub windows: Vec<DwellWindow>,
}

impl Analysis {
    /// Windows in which the load landed on the pinned core.
    pub fn followed_count(&self) -> usize {
        self.windows.iter().filter(|w| w.followed_pin()).count()
    }
}

/// Load the series at `path` and compute its dwell windows.
///
/// Returns [`crate::error::HarnessError::EmptySeries`] when the sink holds no
/// samples, in which case there is nothing to render.
pub fn analyze(path: impl AsRef<Path>, events: &[SwitchEvent]) -> Result<Analysis> {
    let series = load_series(path)?;
    let windows = dwell_windows(&series, events);

    for window in &windows {
        match (window.busiest_core, window.followed_pin()) {
            (Some(busiest), true) => info!(
                "Core {} window: load followed the pin ({:.1}%)",
                window.core_index, window.per_core_mean[busiest]
            ),
            (Some(busiest), false) => warn!(
                "Core {} window: busiest core was {} ({:.1}%)",
                window.core_index, busiest, window.per_core_mean[busiest]
            ),
            (None, _) => warn!("Core {} window: no samples", window.core_index),
        }
    }

    Ok(Analysis { series, windows })
}

/// One window per event, from its timestamp to the next event (or the series end).
pub fn dwell_windows(series: &Series, events: &[SwitchEvent]) -> Vec<DwellWindow> {
    let Some((_, series_end)) = series.time_range() else {
        return Vec::new();
    };

    events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let last = i + 1 == events.len();
            let start = event.timestamp;
            let end = events
                .get(i + 1)
                .map_or(series_end.max(start), |next| next.timestamp);

            let inside: Vec<&[f64]> = series
                .samples()
                .iter()
                .filter(|s| {
                    s.timestamp >= start && (s.timestamp < end || (last && s.timestamp <= end))
                })
                .map(|s| s.per_core.as_slice())
                .collect();

            let per_core_mean = column_means(&inside, series.core_count());
            let busiest_core = per_core_mean
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(core, _)| core);

            DwellWindow {
                core_index: event.core_index,
                start,
                end,
                samples: inside.len(),
                per_core_mean,
                busiest_core,
            }
        })
        .collect()
}

fn column_means(rows: &[&[f64]], cores: usize) -> Vec<f64> {
    if rows.is_empty() {
        return Vec::new();
    }
    let mut sums = vec![0.0; cores];
    for row in rows {
        for (sum, value) in sums.iter_mut().zip(row.iter()) {
            *sum += value;
        }
    }
    sums.iter().map(|sum| sum / rows.len() as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::series::SeriesWriter;
    use crate::types::UtilizationSample;
    use tempfile::tempdir;

    fn sample(t: f64, per_core: &[f64]) -> UtilizationSample {
        UtilizationSample::new(t, per_core.to_vec())
    }

    fn event(t: f64, core: usize) -> SwitchEvent {
        SwitchEvent {
            timestamp: t,
            core_index: core,
        }
    }

    /// Load moves from core 0 to core 1 at t=2.
    fn sweep_series() -> Series {
        Series::new(vec![
            sample(0.5, &[100.0, 1.0]),
            sample(1.5, &[98.0, 3.0]),
            sample(2.5, &[2.0, 100.0]),
            sample(3.5, &[0.0, 97.0]),
        ])
    }

    #[test]
    fn test_windows_follow_the_pin() {
        let series = sweep_series();
        let windows = dwell_windows(&series, &[event(0.0, 0), event(2.0, 1)]);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].samples, 2);
        assert_eq!(windows[0].per_core_mean, vec![99.0, 2.0]);
        assert!(windows[0].followed_pin());
        assert_eq!(windows[1].end, 3.5);
        assert_eq!(windows[1].samples, 2);
        assert_eq!(windows[1].busiest_core, Some(1));
    }

    #[test]
    fn test_window_without_samples() {
        let series = sweep_series();
        let windows = dwell_windows(&series, &[event(0.0, 0), event(0.2, 1), event(0.3, 0)]);

        assert_eq!(windows[1].samples, 0);
        assert!(windows[1].per_core_mean.is_empty());
        assert_eq!(windows[1].busiest_core, None);
        assert!(!windows[1].followed_pin());
    }

    #[test]
    fn test_no_events_no_windows() {
        assert!(dwell_windows(&sweep_series(), &[]).is_empty());
        assert!(dwell_windows(&Series::default(), &[event(1.0, 0)]).is_empty());
    }

    #[test]
    fn test_analyze_header_only_is_empty_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cpu_usage.csv");
        drop(SeriesWriter::create(&path).unwrap());

        let err = analyze(&path, &[event(0.0, 0)]).unwrap_err();
        assert!(matches!(err, HarnessError::EmptySeries(_)));
    }

    #[test]
    fn test_analyze_recorded_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cpu_usage.csv");
        let mut writer = SeriesWriter::create(&path).unwrap();
        for s in sweep_series().samples() {
            writer.append(s).unwrap();
        }
        drop(writer);

        let analysis = analyze(&path, &[event(0.0, 0), event(2.0, 1)]).unwrap();
        assert_eq!(analysis.series.len(), 4);
        assert_eq!(analysis.followed_count(), 2);
    }
}
