//! Run coordinator: owns the lifecycle of one sweep run.
//!
//! A run starts the sampler, starts the workload (external strategy only), drives
//! the affinity scheduler over the sweep plan, stops both units with a bounded join,
//! waits out the drain interval and hands back where the series was written together
//! with the ordered switch events. Only failure to start a unit aborts the run.

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

use crate::config::{Config, DwellStrategy, SweepDiscipline};
use crate::error::{HarnessError, Result};
use crate::platform::{CoreAffinityPinner, CorePinner, Topology};
use crate::reliability::StopSignal;
use crate::sampler::{
    SamplerHandle, SamplerReport, SamplerSettings, SysinfoSource, UtilizationSource,
};
use crate::scheduler::{
    AffinityScheduler, DwellTarget, ExternalDwell, InlineDwell, SweepReport, WorkQueue,
};
use crate::series::write_switch_events;
use crate::workload::{build_kernel, WorkloadHandle, WorkloadReport};

/// Builds the utilization source for each run.
pub type SourceFactory = Box<dyn Fn() -> Box<dyn UtilizationSource> + Send + Sync>;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub series_path: PathBuf,
    pub switch_events_path: Option<PathBuf>,
    pub plan: Vec<usize>,
    pub dwell_strategy: DwellStrategy,
    pub sweep_discipline: SweepDiscipline,
    pub sweep: SweepReport,
    /// `None` if the sampler did not exit within the stop timeout
    pub sampler: Option<SamplerReport>,
    /// `None` if the workload did not exit within the stop timeout
    pub workload: Option<WorkloadReport>,
}

impl RunOutcome {
    /// Write the outcome as pretty JSON.
    pub fn write_report(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        info!("Run report written to {:?}", path.as_ref());
        Ok(())
    }
}

/// Drives a full sweep run.
pub struct RunCoordinator {
    config: Config,
    pinner: Arc<dyn CorePinner>,
    source_factory: SourceFactory,
    stop: StopSignal,
}

impl RunCoordinator {
    /// Coordinator using the host's affinity control and sysinfo sampling.
    pub fn new(config: Config) -> Self {
        Self::with_platform(
            config,
            Arc::new(CoreAffinityPinner::new()),
            Box::new(|| Box::new(SysinfoSource::new()) as Box<dyn UtilizationSource>),
        )
    }

    pub fn with_platform(
        config: Config,
        pinner: Arc<dyn CorePinner>,
        source_factory: SourceFactory,
    ) -> Self {
        Self {
            config,
            pinner,
            source_factory,
            stop: StopSignal::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run-level stop. Triggering it ends the sweep at the current dwell.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn run(&self) -> Result<RunOutcome> {
        let config = &self.config;
        let topology = Topology::detect(&self.pinner);

        let plan = topology.sweep_plan(config.cores.as_deref());
        let planned = plan.as_ref().map_or(0, Vec::len);
        if let Some(shortfall) = config.coverage_shortfall(planned) {
            warn!("{}", shortfall);
        }

        let mut sampler = SamplerHandle::spawn(
            SamplerSettings {
                output_path: config.output_path.clone(),
                duration: config.total_duration,
                interval: config.sample_interval,
            },
            (self.source_factory)(),
        )?;

        let scheduler = AffinityScheduler::new(config.dwell_time, self.stop.clone());
        let (sweep, workload) = match config.dwell_strategy {
            DwellStrategy::External => {
                let mut workload =
                    match WorkloadHandle::spawn(build_kernel(config), self.pinner.clone()) {
                        Ok(workload) => workload,
                        Err(e) => {
                            sampler.stop(config.stop_timeout);
                            return Err(e);
                        }
                    };
                let sweep = {
                    let mut target = ExternalDwell::new(&workload, config.pin_ack_timeout);
                    self.sweep(&scheduler, plan.as_deref(), &mut target)
                };
                (sweep, workload.stop(config.stop_timeout))
            }
            DwellStrategy::Inline => match self.sweep_inline(&scheduler, plan.as_deref()) {
                Ok(result) => result,
                Err(e) => {
                    sampler.stop(config.stop_timeout);
                    return Err(e);
                }
            },
        };

        let sampler_report = sampler.stop(config.stop_timeout);
        if let Some(SamplerReport {
            error: Some(error), ..
        }) = &sampler_report
        {
            warn!("Sampler ended early: {}", error);
        }

        // Not tied to the stop signal: an interrupted run drains too.
        thread::sleep(config.drain_interval);
        debug!("Drained for {:?}", config.drain_interval);

        if let Some(path) = &config.switch_events_path {
            match write_switch_events(path, &sweep.events) {
                Ok(()) => info!("{} switch events written to {:?}", sweep.events.len(), path),
                Err(e) => warn!("Switch events not persisted to {:?}: {}", path, e),
            }
        }

        Ok(RunOutcome {
            series_path: config.output_path.clone(),
            switch_events_path: config.switch_events_path.clone(),
            plan: plan.unwrap_or_default(),
            dwell_strategy: config.dwell_strategy,
            sweep_discipline: config.sweep_discipline,
            sweep,
            sampler: sampler_report,
            workload,
        })
    }

    /// Inline dwell pins the sweeping thread itself, so it gets a thread of its own.
    fn sweep_inline(
        &self,
        scheduler: &AffinityScheduler,
        plan: std::result::Result<&[usize], &HarnessError>,
    ) -> Result<(SweepReport, Option<WorkloadReport>)> {
        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name("sweep".to_string())
                .spawn_scoped(scope, || {
                    let mut target =
                        InlineDwell::new(build_kernel(&self.config), self.pinner.clone());
                    let sweep = self.sweep(scheduler, plan, &mut target);
                    let report = WorkloadReport {
                        kernel: target.kernel_name().to_string(),
                        chunks: target.chunks(),
                        pins: sweep.events.len() as u32,
                    };
                    (sweep, Some(report))
                })
                .map_err(|source| HarnessError::Spawn {
                    unit: "sweep",
                    source,
                })?;

            Ok(handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
        })
    }

    fn sweep(
        &self,
        scheduler: &AffinityScheduler,
        plan: std::result::Result<&[usize], &HarnessError>,
        target: &mut dyn DwellTarget,
    ) -> SweepReport {
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => return SweepReport::misconfigured(e),
        };

        match self.config.sweep_discipline {
            SweepDiscipline::Sequential => scheduler.sweep_sequential(plan, target),
            SweepDiscipline::Queue => {
                let mut queue: WorkQueue = plan.iter().copied().collect();
                scheduler.sweep_queue(&mut queue, target)
            }
        }
    }
}
