//! Affinity scheduler: walks logical cores, pinning the workload to one at a time.
//!
//! For each core the scheduler (1) pins the target to exactly that core, (2) records
//! a [`SwitchEvent`], (3) dwells, and (4) advances. The sequential and work-queue
//! disciplines feed the same per-core step, so they produce identical event
//! sequences. A core that cannot be pinned is reported and skipped without a switch
//! event or a dwell.

pub mod dwell;

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::HarnessError;
use crate::reliability::StopSignal;
use crate::types::SwitchEvent;

pub use dwell::{DwellTarget, ExternalDwell, InlineDwell};

/// FIFO of core indices drained by [`AffinityScheduler::sweep_queue`].
pub type WorkQueue = VecDeque<usize>;

/// A core the sweep could not pin to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub core: usize,
    pub error: String,
}

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Successful switches, in the order they happened
    pub events: Vec<SwitchEvent>,
    /// Cores whose pin was refused
    pub failures: Vec<SweepFailure>,
    /// Why the sweep performed no iterations, if it was misconfigured
    pub misconfiguration: Option<String>,
    /// Whether a run-level stop ended the sweep early
    pub interrupted: bool,
}

impl SweepReport {
    /// Report for a sweep that cannot start.
    pub fn misconfigured(error: &HarnessError) -> Self {
        warn!("Sweep skipped: {}", error);
        Self {
            misconfiguration: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn switch_times(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.timestamp).collect()
    }

    /// Whether every one of `planned` cores was visited.
    pub fn is_complete(&self, planned: usize) -> bool {
        !self.interrupted && self.misconfiguration.is_none() && self.events.len() == planned
    }
}

/// Drives a [`DwellTarget`] across cores.
#[derive(Debug, Clone)]
pub struct AffinityScheduler {
    dwell_time: Duration,
    stop: StopSignal,
}

impl AffinityScheduler {
    /// `stop` is the run-level signal; raising it ends the sweep after the current step.
    pub fn new(dwell_time: Duration, stop: StopSignal) -> Self {
        Self { dwell_time, stop }
    }

    /// Visit `cores` in slice order.
    pub fn sweep_sequential(&self, cores: &[usize], target: &mut dyn DwellTarget) -> SweepReport {
        let mut report = self.begin(cores.len());
        for &core in cores {
            if !self.step(core, target, &mut report) {
                break;
            }
        }
        self.finish(report)
    }

    /// Drain `queue` front to back, visiting each core popped.
    pub fn sweep_queue(&self, queue: &mut WorkQueue, target: &mut dyn DwellTarget) -> SweepReport {
        let mut report = self.begin(queue.len());
        while let Some(core) = queue.pop_front() {
            if !self.step(core, target, &mut report) {
                break;
            }
        }
        self.finish(report)
    }

    fn begin(&self, planned: usize) -> SweepReport {
        if planned == 0 {
            return SweepReport::misconfigured(&HarnessError::Configuration(
                "core count is zero; nothing to sweep".to_string(),
            ));
        }
        info!(
            "Sweeping {} cores with {:?} dwell per core",
            planned, self.dwell_time
        );
        SweepReport::default()
    }

    /// One pin/record/dwell iteration. Returns `false` when the sweep must end.
    fn step(&self, core: usize, target: &mut dyn DwellTarget, report: &mut SweepReport) -> bool {
        if self.stop.is_stopped() {
            report.interrupted = true;
            return false;
        }

        if let Err(e) = target.pin(core) {
            warn!("Skipping core {}: {}", core, e);
            report.failures.push(SweepFailure {
                core,
                error: e.to_string(),
            });
            return true;
        }

        report.events.push(SwitchEvent::now(core));
        info!("Switched to logical processor {}", core);

        if target.dwell(self.dwell_time, &self.stop) {
            report.interrupted = true;
            return false;
        }
        true
    }

    fn finish(&self, report: SweepReport) -> SweepReport {
        if report.misconfiguration.is_none() {
            info!(
                "Sweep finished: {} switches, {} failures{}",
                report.events.len(),
                report.failures.len(),
                if report.interrupted { ", interrupted" } else { "" }
            );
        }
        report
    }
}
