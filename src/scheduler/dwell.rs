//! Dwell strategies: what keeps the pinned core busy between switches.

use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::platform::CorePinner;
use crate::reliability::StopSignal;
use crate::workload::{Kernel, WorkloadHandle};

/// The thing the scheduler moves from core to core.
pub trait DwellTarget {
    /// Restrict the target to exactly `core`.
    fn pin(&mut self, core: usize) -> Result<()>;

    /// Hold the current pin for `dwell`. Returns `true` if `stop` cut the dwell short.
    fn dwell(&mut self, dwell: Duration, stop: &StopSignal) -> bool;
}

/// A separate workload thread spins on its own; the scheduler only re-pins it.
pub struct ExternalDwell<'a> {
    workload: &'a WorkloadHandle,
    ack_timeout: Duration,
}

impl<'a> ExternalDwell<'a> {
    pub fn new(workload: &'a WorkloadHandle, ack_timeout: Duration) -> Self {
        Self {
            workload,
            ack_timeout,
        }
    }
}

impl DwellTarget for ExternalDwell<'_> {
    fn pin(&mut self, core: usize) -> Result<()> {
        self.workload.pin(core, self.ack_timeout)
    }

    fn dwell(&mut self, dwell: Duration, stop: &StopSignal) -> bool {
        stop.wait_timeout(dwell)
    }
}

/// The scheduler's own thread is pinned and re-runs the kernel until the per-core
/// deadline.
pub struct InlineDwell {
    kernel: Box<dyn Kernel>,
    pinner: Arc<dyn CorePinner>,
    chunks: u64,
}

impl InlineDwell {
    pub fn new(kernel: Box<dyn Kernel>, pinner: Arc<dyn CorePinner>) -> Self {
        Self {
            kernel,
            pinner,
            chunks: 0,
        }
    }

    /// Kernel chunks executed across all dwells so far.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }
}

impl DwellTarget for InlineDwell {
    fn pin(&mut self, core: usize) -> Result<()> {
        self.pinner.pin_current(core)
    }

    fn dwell(&mut self, dwell: Duration, stop: &StopSignal) -> bool {
        let deadline = Instant::now() + dwell;
        while Instant::now() < deadline {
            if stop.is_stopped() {
                return true;
            }
            black_box(self.kernel.run_chunk());
            self.chunks += 1;
        }
        stop.is_stopped()
    }
}
