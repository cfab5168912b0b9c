//! CPU affinity control and logical core discovery.
//!
//! Pinning always applies to the calling thread; a unit that must be moved between
//! cores pins itself when asked to (see [`crate::workload`]). The [`CorePinner`] trait
//! is the seam that lets the scheduler run against a fake platform in tests.

use core_affinity::{self, CoreId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};

/// Platform capability to bind the calling thread to exactly one logical core.
pub trait CorePinner: Send + Sync {
    /// Logical core indices the calling process may be pinned to, ascending.
    fn available_cores(&self) -> Vec<usize>;

    /// Restrict the calling thread to `core` only.
    fn pin_current(&self, core: usize) -> Result<()>;
}

/// [`CorePinner`] backed by the `core_affinity` crate.
#[derive(Debug, Clone)]
pub struct CoreAffinityPinner {
    cores: Vec<CoreId>,
}

impl CoreAffinityPinner {
    /// Create a pinner with automatic core detection
    pub fn new() -> Self {
        let mut cores = core_affinity::get_core_ids().unwrap_or_default();
        cores.sort_by_key(|c| c.id);

        if cores.is_empty() {
            warn!("CPU affinity not supported on this platform");
        } else {
            info!(
                "CPU affinity available on {} cores: {:?}",
                cores.len(),
                cores.iter().map(|c| c.id).collect::<Vec<_>>()
            );
        }

        Self { cores }
    }

    /// Check if CPU affinity is supported on this system
    pub fn is_affinity_supported(&self) -> bool {
        !self.cores.is_empty()
    }
}

impl Default for CoreAffinityPinner {
    fn default() -> Self {
        Self::new()
    }
}

impl CorePinner for CoreAffinityPinner {
    fn available_cores(&self) -> Vec<usize> {
        self.cores.iter().map(|c| c.id).collect()
    }

    fn pin_current(&self, core: usize) -> Result<()> {
        let core_id = self
            .cores
            .iter()
            .copied()
            .find(|c| c.id == core)
            .ok_or_else(|| HarnessError::Affinity {
                core,
                reason: format!(
                    "core index out of range ({} logical cores available)",
                    self.cores.len()
                ),
            })?;

        if core_affinity::set_for_current(core_id) {
            debug!(
                "Pinned thread {:?} to core {} (running on {:?})",
                std::thread::current().name(),
                core,
                current_cpu()
            );
            Ok(())
        } else {
            Err(HarnessError::Affinity {
                core,
                reason: "the platform rejected the affinity mask".to_string(),
            })
        }
    }
}

/// Logical CPU the calling thread is executing on, where the platform reports it.
#[cfg(target_os = "linux")]
pub fn current_cpu() -> Option<usize> {
    // SAFETY: sched_getcpu has no preconditions and only reads scheduler state.
    let cpu = unsafe { libc::sched_getcpu() };
    usize::try_from(cpu).ok()
}

#[cfg(not(target_os = "linux"))]
pub fn current_cpu() -> Option<usize> {
    None
}

/// Logical processor layout resolved once at run start.
#[derive(Debug, Clone)]
pub struct Topology {
    /// Logical CPUs reported by the OS
    pub logical_cpus: usize,
    /// Cores the process may be pinned to
    pub pinnable: Vec<usize>,
}

impl Topology {
    pub fn detect(pinner: &Arc<dyn CorePinner>) -> Self {
        let topology = Self {
            logical_cpus: num_cpus::get(),
            pinnable: pinner.available_cores(),
        };
        info!("{}", topology);
        topology
    }

    pub fn core_count(&self) -> usize {
        self.pinnable.len()
    }

    /// Cores a sweep visits: the explicit list if given, otherwise every pinnable core.
    ///
    /// Explicit entries are kept verbatim, including out-of-range ones, so the sweep can
    /// report each bad index individually.
    pub fn sweep_plan(&self, explicit: Option<&[usize]>) -> Result<Vec<usize>> {
        let plan = match explicit {
            Some(cores) => cores.to_vec(),
            None => self.pinnable.clone(),
        };

        if plan.is_empty() {
            return Err(HarnessError::Configuration(format!(
                "no logical cores to sweep (os reports {} logical CPUs, {} pinnable)",
                self.logical_cpus,
                self.pinnable.len()
            )));
        }

        Ok(plan)
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CPU Topology: {} logical CPUs, pinnable={:?}",
            self.logical_cpus, self.pinnable
        )
    }
}
