//! Tracing subscriber bootstrap for processes embedding ivault.
//!
//! The library itself only emits `tracing` events; whoever owns the process
//! calls [`init_logging`] once. `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{IvaultError, IvaultResult};

/// Install the global subscriber described by `config`.
///
/// Fails if the format is unknown or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> IvaultResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        "text" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init(),
        other => {
            return Err(IvaultError::Logging(format!(
                "unknown log format '{other}' (expected json or text)"
            )))
        }
    };

    result.map_err(|e| IvaultError::Logging(e.to_string()))
}
