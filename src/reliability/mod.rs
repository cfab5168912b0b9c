//! Shutdown coordination for the harness's concurrent units.
//!
//! - Idempotent stop signals with interruptible timed waits
//! - Bounded thread joins
//! - SIGINT/SIGTERM handling for the binaries

pub mod shutdown;

pub use shutdown::*;
