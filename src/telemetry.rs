//! Tracing subscriber setup shared by the binaries.

use tracing::debug;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

use crate::config::LogFormat;
use crate::error::{HarnessError, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Fails if a subscriber is already set.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = Registry::default().with(env_filter);

    let installed = match format {
        LogFormat::Compact => subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .json(),
            )
            .try_init(),
    };

    installed.map_err(|e| HarnessError::Configuration(format!("tracing init failed: {}", e)))?;
    debug!("Tracing initialized with {:?} output", format);
    Ok(())
}
