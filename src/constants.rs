//! Domain constants for core-sweep.
//!
//! Compile-time values used throughout the harness, kept apart from the runtime
//! configuration in [`crate::config`] which uses some of them as defaults.

/// Series sink layout.
pub mod series {
    /// Header field holding the capture instant.
    pub const TIMESTAMP_FIELD: &str = "timestamp";

    /// Header field holding the bracketed per-core list.
    pub const CPU_PERCENT_FIELD: &str = "cpu_percent";

    /// Separator between per-core values inside the bracketed list.
    pub const LIST_SEPARATOR: &str = ", ";

    /// Default series sink location.
    pub const DEFAULT_OUTPUT_PATH: &str = "cpu_usage.csv";
}

/// Run timing defaults, in seconds.
pub mod timing {
    /// Sampler run length.
    pub const DEFAULT_TOTAL_DURATION_SECS: f64 = 175.0;

    /// Interval each utilization sample is averaged over.
    pub const DEFAULT_SAMPLE_INTERVAL_SECS: f64 = 1.0;

    /// Time the workload stays on each core.
    pub const DEFAULT_DWELL_TIME_SECS: f64 = 15.0;

    /// Wait after stop signals before the sink is read.
    pub const DEFAULT_DRAIN_INTERVAL_SECS: f64 = 2.0;

    /// Upper bound on waiting for a stopped unit's thread to exit.
    pub const DEFAULT_STOP_TIMEOUT_SECS: f64 = 5.0;

    /// Upper bound on waiting for the workload to acknowledge a pin request.
    pub const DEFAULT_PIN_ACK_TIMEOUT_SECS: f64 = 2.0;

    /// Poll period while waiting for a thread to finish.
    pub const JOIN_POLL_MILLIS: u64 = 10;
}

/// Workload kernel defaults.
pub mod workload {
    /// First number of the trial-division window.
    pub const PRIME_WINDOW_START: u64 = 100_000;

    /// End (exclusive) of the trial-division window.
    pub const PRIME_WINDOW_END: u64 = 100_500;

    /// Multiply-add iterations per spin chunk.
    pub const SPIN_ITERATIONS_PER_CHUNK: u64 = 1 << 20;
}

/// Text renderer defaults.
pub mod render {
    /// Number of time buckets per rendered line.
    pub const DEFAULT_WIDTH: usize = 72;

    /// Glyphs from idle to saturated.
    pub const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    /// Glyph marking a switch event.
    pub const SWITCH_MARKER: char = '|';
}

/// Matrix benchmark defaults.
pub mod matmul {
    /// Square matrix sizes.
    pub const DEFAULT_SIZES: [usize; 3] = [100, 200, 300];

    /// Repetition counts per size.
    pub const DEFAULT_REPETITIONS: [usize; 3] = [10, 20, 30];

    /// Tile edge of the blocked kernel.
    pub const TILE: usize = 64;

    /// RNG seed for reproducible inputs.
    pub const DEFAULT_SEED: u64 = 0x5eed;
}
