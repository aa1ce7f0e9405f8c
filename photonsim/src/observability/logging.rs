//! Subscriber installation for `tracing` output.

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::{SimulationError, SimulationResult};
use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns [`SimulationError::Config`] if the level is not a valid filter
/// directive or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> SimulationResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            SimulationError::Config(format!("invalid log level '{}': {err}", config.level))
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| SimulationError::Config(format!("cannot install logger: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_reported() {
        let config = LoggingConfig::default();
        let _ = init_logging(&config);

        let second = init_logging(&config);
        assert!(matches!(second, Err(SimulationError::Config(_))));
    }
}
