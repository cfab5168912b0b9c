//! Stop signalling and bounded shutdown for the harness's concurrent units.
//!
//! Every unit (sampler, workload, the sweep itself) owns a [`StopSignal`]. Triggering
//! is idempotent and wakes any thread blocked in a timed wait on the signal, so a
//! unit sleeping through a sample interval or a dwell reacts immediately.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::constants::timing::JOIN_POLL_MILLIS;

#[derive(Debug, Default)]
struct StopState {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

/// Cloneable, idempotent stop flag supporting interruptible timed waits.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    state: Arc<StopState>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns `true` only for the call that actually raised it.
    pub fn trigger(&self) -> bool {
        let mut stopped = self.state.stopped.lock();
        if *stopped {
            return false;
        }
        *stopped = true;
        self.state.condvar.notify_all();
        true
    }

    pub fn is_stopped(&self) -> bool {
        *self.state.stopped.lock()
    }

    /// Block for up to `timeout`. Returns `true` if the signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(deadline),
            None => {
                let mut stopped = self.state.stopped.lock();
                while !*stopped {
                    self.state.condvar.wait(&mut stopped);
                }
                true
            }
        }
    }

    /// Block until `deadline`. Returns `true` if the signal was raised.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.state.stopped.lock();
        while !*stopped {
            if self
                .state
                .condvar
                .wait_until(&mut stopped, deadline)
                .timed_out()
            {
                break;
            }
        }
        *stopped
    }
}

/// Join `handle`, giving up after `timeout`.
///
/// A thread that does not finish in time is detached and `None` is returned; the
/// caller never blocks indefinitely on a misbehaving unit.
pub fn join_with_timeout<T>(handle: JoinHandle<T>, timeout: Duration, unit: &str) -> Option<T> {
    let start = Instant::now();
    while !handle.is_finished() {
        if start.elapsed() >= timeout {
            warn!(
                "{} did not exit within {:?}; detaching its thread",
                unit, timeout
            );
            return None;
        }
        std::thread::sleep(Duration::from_millis(JOIN_POLL_MILLIS));
    }

    match handle.join() {
        Ok(value) => {
            debug!("{} exited", unit);
            Some(value)
        }
        Err(_) => {
            error!("{} panicked", unit);
            None
        }
    }
}

/// Raise `stop` on the first SIGINT or SIGTERM.
pub async fn stop_on_signal(stop: StopSignal) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }

    if stop.trigger() {
        info!("Stopping the sweep early");
    }
}
