//! Synthetic CPU-bound workload.

pub mod kernel;
pub mod unit;

pub use kernel::{build_kernel, is_prime, Kernel, PrimeScan, SpinArithmetic};
#[cfg(test)]
pub(crate) use kernel::testing;
pub use unit::{WorkloadHandle, WorkloadReport};
