//! The `core_sweep` library.
//!
//! Moves a CPU-bound workload across every logical core in turn, one dwell
//! interval per core, while a sampler thread records per-core utilization to a CSV
//! series. The recorded series and switch instants can then be analyzed and
//! rendered to check that load followed the pin. A separate matrix multiplication
//! timing harness lives in [`bench`].

pub mod analysis;
pub mod bench;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod platform;
pub mod reliability;
pub mod sampler;
pub mod scheduler;
pub mod series;
pub mod telemetry;
pub mod types;
pub mod workload;
