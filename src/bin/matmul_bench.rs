//! Matrix multiplication timing grid.
//!
//! Runs the naive and blocked kernels for every configured size and repetition
//! count, printing one summary table and optionally writing the results as JSON.

use anyhow::Context;
use std::fs::File;
use std::io::BufWriter;
use tracing::info;

use core_sweep::{bench::run_grid, config::MatmulConfig, telemetry::init_tracing};

fn main() -> anyhow::Result<()> {
    let config = MatmulConfig::load().context("Failed to load benchmark configuration")?;
    init_tracing(&config.log_level, config.log_format)?;

    info!(
        "Benchmarking sizes {:?} with repetitions {:?} (seed {:#x})",
        config.sizes, config.repetitions, config.seed
    );
    let results = run_grid(&config)?;

    println!(
        "{:<8} {:>5} {:>5} {:>12} {:>12} {:>12} {:>12} {:>10}",
        "kernel", "N", "NT", "min (s)", "max (s)", "mean (s)", "std-dev (s)", "MFLOPS"
    );
    for result in &results {
        let s = &result.summary;
        println!(
            "{:<8} {:>5} {:>5} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>10.2}",
            result.kernel, result.n, result.repetitions, s.min, s.max, s.mean, s.std_dev, result.mflops
        );
    }

    if let Some(path) = &config.report_path {
        let writer = BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        );
        serde_json::to_writer_pretty(writer, &results)?;
        info!("Results written to {:?}", path);
    }

    Ok(())
}
