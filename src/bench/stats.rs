//! Timing statistics.

use serde::Serialize;

use crate::error::{HarnessError, Result};

/// Summary of a set of wall-clock timings, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); zero for a single timing
    pub std_dev: f64,
}

impl Summary {
    pub fn from_timings(timings: &[f64]) -> Result<Self> {
        if timings.is_empty() {
            return Err(HarnessError::Benchmark(
                "cannot summarize zero repetitions".to_string(),
            ));
        }

        let count = timings.len();
        let min = timings.iter().copied().fold(f64::INFINITY, f64::min);
        let max = timings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = timings.iter().sum::<f64>() / count as f64;

        let std_dev = if count > 1 {
            let variance =
                timings.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Ok(Self {
            count,
            min,
            max,
            mean,
            std_dev,
        })
    }
}
