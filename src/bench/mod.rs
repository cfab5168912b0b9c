//! Matrix multiplication timing harness.
//!
//! Each run multiplies `repetitions` pairs of fresh random `n x n` matrices, timing
//! only the multiply, and reports min/max/mean/std-dev plus throughput in MFLOPS.

pub mod matmul;
pub mod stats;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::hint::black_box;
use std::time::Instant;
use tracing::info;

use crate::config::MatmulConfig;
use crate::error::{HarnessError, Result};

pub use matmul::{BlockedMatMul, MatMulKernel, Matrix, NaiveMatMul};
pub use stats::Summary;

/// Millions of floating-point operations per second for an `n x n` multiply taking
/// `mean_secs` on average (`2 * n^3` operations).
pub fn mflops(mean_secs: f64, n: usize) -> f64 {
    let operations = 2.0 * (n as f64).powi(3);
    operations / mean_secs / 1e6
}

/// Timing result for one kernel at one size.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub kernel: String,
    pub n: usize,
    pub repetitions: usize,
    pub summary: Summary,
    pub mflops: f64,
}

/// `repetitions` timed multiplies of size `n` with kernel `K`.
pub struct BenchmarkRun<K: MatMulKernel> {
    kernel: K,
    n: usize,
    repetitions: usize,
}

impl<K: MatMulKernel> BenchmarkRun<K> {
    pub fn new(kernel: K, n: usize, repetitions: usize) -> Self {
        Self {
            kernel,
            n,
            repetitions,
        }
    }

    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<BenchmarkResult> {
        if self.n == 0 {
            return Err(HarnessError::Benchmark(
                "matrix size must be positive".to_string(),
            ));
        }

        let mut c = Matrix::zeros(self.n);
        let mut timings = Vec::with_capacity(self.repetitions);
        for _ in 0..self.repetitions {
            let a = Matrix::random(self.n, rng);
            let b = Matrix::random(self.n, rng);

            let started = Instant::now();
            self.kernel.multiply(black_box(&a), black_box(&b), &mut c);
            timings.push(started.elapsed().as_secs_f64());
            black_box(&c);
        }

        let summary = Summary::from_timings(&timings)?;
        let result = BenchmarkResult {
            kernel: self.kernel.name().to_string(),
            n: self.n,
            repetitions: self.repetitions,
            summary,
            mflops: mflops(summary.mean, self.n),
        };

        info!(
            kernel = %result.kernel,
            n = result.n,
            repetitions = result.repetitions,
            "min {:.6}s max {:.6}s mean {:.6}s std-dev {:.6}s, {:.2} MFLOPS",
            summary.min,
            summary.max,
            summary.mean,
            summary.std_dev,
            result.mflops
        );
        Ok(result)
    }
}

/// Run both kernels over every `sizes x repetitions` combination.
pub fn run_grid(config: &MatmulConfig) -> Result<Vec<BenchmarkResult>> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut results = Vec::with_capacity(config.sizes.len() * config.repetitions.len() * 2);

    for &n in &config.sizes {
        for &repetitions in &config.repetitions {
            results.push(BenchmarkRun::new(NaiveMatMul, n, repetitions).run(&mut rng)?);
            results.push(
                BenchmarkRun::new(BlockedMatMul::default(), n, repetitions).run(&mut rng)?,
            );
        }
    }

    Ok(results)
}
