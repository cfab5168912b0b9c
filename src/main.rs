//! Affinity sweep harness.
//!
//! Loads the configuration, runs one sweep across the logical cores while sampling
//! per-core utilization, then renders the recorded series with the switch instants
//! marked. Ctrl-C or SIGTERM ends the sweep early; whatever was recorded is still
//! analyzed.

use anyhow::Context;
use std::io;
use tracing::{info, warn};

use core_sweep::{
    analysis::{analyze, Renderer, TextRenderer},
    config::Config,
    coordinator::RunCoordinator,
    error::HarnessError,
    reliability::stop_on_signal,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    if std::env::args().any(|arg| arg == "--print-config") {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(&config.log_level, config.log_format)?;
    info!(
        "Starting sweep: dwell {:?} per core, sampling every {:?} for {:?}, {:?} dwell, {:?} discipline",
        config.dwell_time,
        config.sample_interval,
        config.total_duration,
        config.dwell_strategy,
        config.sweep_discipline
    );

    let coordinator = RunCoordinator::new(config.clone());
    let signals = tokio::spawn(stop_on_signal(coordinator.stop_signal()));

    let outcome = tokio::task::spawn_blocking(move || coordinator.run())
        .await
        .context("Sweep task panicked")??;
    signals.abort();

    if let Some(reason) = &outcome.sweep.misconfiguration {
        warn!("Sweep did not run: {}", reason);
    }
    for failure in &outcome.sweep.failures {
        warn!("Core {} was skipped: {}", failure.core, failure.error);
    }

    if let Some(path) = &config.report_path {
        outcome.write_report(path)?;
    }

    match analyze(&outcome.series_path, &outcome.sweep.events) {
        Ok(analysis) => {
            let mut renderer = TextRenderer::new(io::stdout().lock(), config.render_width);
            renderer.render(&analysis.series, &outcome.sweep.events)?;
            info!(
                "Load followed the pin in {} of {} dwell windows",
                analysis.followed_count(),
                analysis.windows.len()
            );
        }
        Err(HarnessError::EmptySeries(path)) => {
            warn!("No samples were recorded in {:?}; nothing to render", path);
        }
        Err(e) => return Err(e).context("Failed to analyze the recorded series"),
    }

    Ok(())
}
