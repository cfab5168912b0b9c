//! The workload as an independently scheduled thread.
//!
//! Only the workload thread changes its own affinity, and only when the scheduler
//! asks it to through [`WorkloadHandle::pin`]. Pin requests and the stop signal are
//! checked between kernel chunks. A request the scheduler has given up on is never
//! applied.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::hint::black_box;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::kernel::Kernel;
use crate::error::{HarnessError, Result};
use crate::platform::CorePinner;
use crate::reliability::{join_with_timeout, StopSignal};

enum PinState {
    Pending,
    Abandoned,
    Done(Result<()>),
}

/// One pin handshake. The state lock is held across the pin itself, so the
/// scheduler either sees the outcome or abandons the request before it is applied.
struct PinTicket {
    state: Mutex<PinState>,
    answered: Condvar,
}

struct PinRequest {
    core: usize,
    ticket: Arc<PinTicket>,
}

/// Work done by a workload thread over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadReport {
    pub kernel: String,
    pub chunks: u64,
    pub pins: u32,
}

/// Start/stop and pin authority over a running workload thread.
pub struct WorkloadHandle {
    stop: StopSignal,
    requests: Sender<PinRequest>,
    thread: Option<JoinHandle<WorkloadReport>>,
}

impl WorkloadHandle {
    /// Start `kernel` on a new thread named `workload`.
    pub fn spawn(kernel: Box<dyn Kernel>, pinner: Arc<dyn CorePinner>) -> Result<Self> {
        let (requests, inbox) = channel::unbounded();
        let stop = StopSignal::new();
        let worker_stop = stop.clone();

        let thread = thread::Builder::new()
            .name("workload".to_string())
            .spawn(move || run_workload(kernel, pinner, inbox, worker_stop))
            .map_err(|source| HarnessError::Spawn {
                unit: "workload",
                source,
            })?;

        Ok(Self {
            stop,
            requests,
            thread: Some(thread),
        })
    }

    /// Ask the workload to pin itself to `core` and wait up to `timeout` for the outcome.
    ///
    /// On timeout the request is withdrawn: the workload will not apply it later.
    pub fn pin(&self, core: usize, timeout: Duration) -> Result<()> {
        let ticket = Arc::new(PinTicket {
            state: Mutex::new(PinState::Pending),
            answered: Condvar::new(),
        });
        let deadline = Instant::now().checked_add(timeout);
        self.requests
            .send(PinRequest {
                core,
                ticket: ticket.clone(),
            })
            .map_err(|_| HarnessError::Affinity {
                core,
                reason: "workload is not running".to_string(),
            })?;

        let mut state = ticket.state.lock();
        while matches!(*state, PinState::Pending) {
            match deadline {
                Some(deadline) => {
                    if ticket.answered.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => ticket.answered.wait(&mut state),
            }
        }

        match std::mem::replace(&mut *state, PinState::Abandoned) {
            PinState::Done(result) => result,
            _ => Err(HarnessError::Affinity {
                core,
                reason: format!("workload did not acknowledge within {:?}", timeout),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the workload and wait up to `timeout` for its thread.
    ///
    /// Safe to call repeatedly; only the first call returns a report.
    pub fn stop(&mut self, timeout: Duration) -> Option<WorkloadReport> {
        self.stop.trigger();
        let handle = self.thread.take()?;
        join_with_timeout(handle, timeout, "workload")
    }
}

impl Drop for WorkloadHandle {
    fn drop(&mut self) {
        self.stop.trigger();
    }
}

fn run_workload(
    mut kernel: Box<dyn Kernel>,
    pinner: Arc<dyn CorePinner>,
    inbox: Receiver<PinRequest>,
    stop: StopSignal,
) -> WorkloadReport {
    info!("Workload started with {} kernel", kernel.name());
    let mut report = WorkloadReport {
        kernel: kernel.name().to_string(),
        ..WorkloadReport::default()
    };

    while !stop.is_stopped() {
        while let Ok(request) = inbox.try_recv() {
            let mut state = request.ticket.state.lock();
            if !matches!(*state, PinState::Pending) {
                debug!("Dropping withdrawn pin request for core {}", request.core);
                continue;
            }
            let result = pinner.pin_current(request.core);
            if result.is_ok() {
                report.pins += 1;
            }
            *state = PinState::Done(result);
            request.ticket.answered.notify_one();
        }

        black_box(kernel.run_chunk());
        report.chunks += 1;
    }

    debug!(
        "Workload stopped after {} chunks and {} pins",
        report.chunks, report.pins
    );
    report
}
