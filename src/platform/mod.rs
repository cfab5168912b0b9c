//! Platform capabilities the harness depends on.
//!
//! Only two are needed: binding a thread to a single logical core, and discovering
//! which logical cores exist. Per-core utilization sampling lives in
//! [`crate::sampler`].

pub mod affinity;

pub use affinity::{current_cpu, CoreAffinityPinner, CorePinner, Topology};

#[cfg(test)]
pub(crate) use affinity::testing;
