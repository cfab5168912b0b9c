//! Persisted utilization series.
//!
//! Sink layout:
//!
//! ```text
//! timestamp,cpu_percent
//! 1760612345.018,"[3.0, 100.0, 1.0, 0.0]"
//! ```

pub mod codec;
pub mod sink;

pub use sink::{
    load_series, load_switch_events, read_series, write_switch_events, SeriesWriter,
};
