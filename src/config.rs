//! Run configuration loaded from multiple sources.
//!
//! Values are layered with `figment`: built-in defaults, then `core-sweep.toml`,
//! then `core-sweep.yaml`, then `CORE_SWEEP_*` environment variables. All durations
//! are expressed in fractional seconds.

use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::constants::{matmul, render, series, timing, workload};
use crate::error::{ErrorContext, HarnessError, Result};

/// Serde helper for Duration serialization/deserialization as fractional seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// How the workload is kept busy while it dwells on a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwellStrategy {
    /// A separate workload thread spins and is re-pinned on request.
    External,
    /// The scheduler thread pins itself and runs the kernel until the dwell deadline.
    Inline,
}

/// Order in which the scheduler is fed core indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepDiscipline {
    /// Walk the core list directly.
    Sequential,
    /// Push every core onto a FIFO queue up front, then drain it.
    Queue,
}

/// Kernel used to load the pinned core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    /// Trial-division primality scan over a fixed window.
    Prime,
    /// Tight integer multiply-add loop.
    Spin,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

/// Configuration of one affinity sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How long the sampler runs
    #[serde(with = "duration_secs")]
    pub total_duration: Duration,

    /// Interval each sample is averaged over
    #[serde(with = "duration_secs")]
    pub sample_interval: Duration,

    /// Time spent pinned to each core
    #[serde(with = "duration_secs")]
    pub dwell_time: Duration,

    /// Wait after stopping the units, before the sink is read
    #[serde(with = "duration_secs")]
    pub drain_interval: Duration,

    /// Bound on waiting for a stopped unit to exit
    #[serde(with = "duration_secs")]
    pub stop_timeout: Duration,

    /// Bound on waiting for the workload to take a pin request; at least one
    /// kernel chunk long
    #[serde(with = "duration_secs")]
    pub pin_ack_timeout: Duration,

    /// Series sink location
    pub output_path: PathBuf,

    /// Where to persist switch events, if anywhere
    #[serde(default)]
    pub switch_events_path: Option<PathBuf>,

    /// Where to write the JSON run report, if anywhere
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    pub dwell_strategy: DwellStrategy,

    pub sweep_discipline: SweepDiscipline,

    /// Explicit core indices to visit; all pinnable cores when unset
    #[serde(default)]
    pub cores: Option<Vec<usize>>,

    pub workload: WorkloadKind,

    pub prime_window_start: u64,

    pub prime_window_end: u64,

    /// Time buckets per rendered line
    pub render_width: usize,

    /// Default log filter, overridden by RUST_LOG
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_duration: Duration::from_secs_f64(timing::DEFAULT_TOTAL_DURATION_SECS),
            sample_interval: Duration::from_secs_f64(timing::DEFAULT_SAMPLE_INTERVAL_SECS),
            dwell_time: Duration::from_secs_f64(timing::DEFAULT_DWELL_TIME_SECS),
            drain_interval: Duration::from_secs_f64(timing::DEFAULT_DRAIN_INTERVAL_SECS),
            stop_timeout: Duration::from_secs_f64(timing::DEFAULT_STOP_TIMEOUT_SECS),
            pin_ack_timeout: Duration::from_secs_f64(timing::DEFAULT_PIN_ACK_TIMEOUT_SECS),
            output_path: PathBuf::from(series::DEFAULT_OUTPUT_PATH),
            switch_events_path: None,
            report_path: None,
            dwell_strategy: DwellStrategy::External,
            sweep_discipline: SweepDiscipline::Sequential,
            cores: None,
            workload: WorkloadKind::Prime,
            prime_window_start: workload::PRIME_WINDOW_START,
            prime_window_end: workload::PRIME_WINDOW_END,
            render_width: render::DEFAULT_WIDTH,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables prefixed `CORE_SWEEP_` (highest priority)
    /// 2. core-sweep.yaml (if exists)
    /// 3. core-sweep.toml (if exists)
    /// 4. Built-in defaults (lowest priority)
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("core-sweep.toml"))
                .merge(Yaml::file("core-sweep.yaml"))
                .merge(Env::prefixed("CORE_SWEEP_")),
        )
    }

    /// Extract and validate a configuration from an already layered figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment
            .extract()
            .with_context(|| "Failed to load configuration".to_string())?;

        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval.is_zero() {
            return Err(HarnessError::Configuration(
                "sample_interval must be greater than zero".to_string(),
            ));
        }

        if self.dwell_time.is_zero() {
            return Err(HarnessError::Configuration(
                "dwell_time must be greater than zero".to_string(),
            ));
        }

        if self.pin_ack_timeout.is_zero() {
            return Err(HarnessError::Configuration(
                "pin_ack_timeout must be greater than zero".to_string(),
            ));
        }

        if self.prime_window_start >= self.prime_window_end {
            return Err(HarnessError::Configuration(format!(
                "prime window [{}, {}) is empty",
                self.prime_window_start, self.prime_window_end
            )));
        }

        if self.render_width == 0 {
            return Err(HarnessError::Configuration(
                "render_width must be greater than zero".to_string(),
            ));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(HarnessError::Configuration(
                "output_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Describe why the sampler would stop before a sweep over `core_count` cores ends.
    ///
    /// A short duration is allowed; it only truncates the tail of the recorded sweep.
    pub fn coverage_shortfall(&self, core_count: usize) -> Option<String> {
        let sweep = self.dwell_time.as_secs_f64() * core_count as f64;
        let duration = self.total_duration.as_secs_f64();
        (duration < sweep).then(|| {
            format!(
                "total_duration {:.1}s is shorter than the {:.1}s sweep over {} cores; the tail of the sweep will not be sampled",
                duration, sweep, core_count
            )
        })
    }

    /// Export configuration to TOML format
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            HarnessError::Configuration(format!("Failed to serialize to TOML: {}", e))
        })
    }
}

/// Configuration of the matrix multiplication benchmark grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatmulConfig {
    /// Square matrix sizes N
    pub sizes: Vec<usize>,

    /// Repetition counts NT
    pub repetitions: Vec<usize>,

    /// Seed for the random input matrices
    pub seed: u64,

    /// Where to write the JSON results, if anywhere
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for MatmulConfig {
    fn default() -> Self {
        Self {
            sizes: matmul::DEFAULT_SIZES.to_vec(),
            repetitions: matmul::DEFAULT_REPETITIONS.to_vec(),
            seed: matmul::DEFAULT_SEED,
            report_path: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl MatmulConfig {
    /// Load from defaults, `matmul-bench.toml` and `MATMUL_BENCH_*` variables.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(MatmulConfig::default()))
                .merge(Toml::file("matmul-bench.toml"))
                .merge(Env::prefixed("MATMUL_BENCH_")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: MatmulConfig = figment
            .extract()
            .with_context(|| "Failed to load benchmark configuration".to_string())?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() || self.sizes.contains(&0) {
            return Err(HarnessError::Configuration(
                "sizes must be a non-empty list of positive integers".to_string(),
            ));
        }

        if self.repetitions.is_empty() || self.repetitions.contains(&0) {
            return Err(HarnessError::Configuration(
                "repetitions must be a non-empty list of positive integers".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dwell_time, Duration::from_secs(15));
        assert_eq!(config.dwell_strategy, DwellStrategy::External);
        assert!(MatmulConfig::default().validate().is_ok());
    }

    #[test]
    fn test_figment_overrides_fractional_seconds() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                dwell_time = 0.25
                sample_interval = 0.1
                dwell_strategy = "inline"
                sweep_discipline = "queue"
                cores = [0, 2]
                "#,
            ));

        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.dwell_time, Duration::from_millis(250));
        assert_eq!(config.sample_interval, Duration::from_millis(100));
        assert_eq!(config.dwell_strategy, DwellStrategy::Inline);
        assert_eq!(config.sweep_discipline, SweepDiscipline::Queue);
        assert_eq!(config.cores, Some(vec![0, 2]));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string("sample_interval = 0"));

        let err = Config::from_figment(figment).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn test_pin_ack_timeout_is_configurable() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string("pin_ack_timeout = 12.5"));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.pin_ack_timeout, Duration::from_millis(12_500));

        let config = Config {
            pin_ack_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HarnessError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_prime_window_rejected() {
        let config = Config {
            prime_window_start: 10,
            prime_window_end: 10,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_coverage_shortfall() {
        let config = Config {
            total_duration: Duration::from_secs(60),
            dwell_time: Duration::from_secs(15),
            ..Config::default()
        };
        assert!(config.coverage_shortfall(4).is_none());
        assert!(config.coverage_shortfall(8).is_some());
    }

    #[test]
    fn test_toml_export_round_trips() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let figment = Figment::from(Toml::string(&text));
        let reloaded = Config::from_figment(figment).unwrap();
        assert_eq!(reloaded.dwell_time, config.dwell_time);
        assert_eq!(reloaded.output_path, config.output_path);
    }

    #[test]
    fn test_matmul_rejects_zero_repetitions() {
        let config = MatmulConfig {
            repetitions: vec![10, 0],
            ..MatmulConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
