//! Global `tracing` subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Installs the global subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber or logger is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok(), &config.level)?;

    let (text, json) = if config.json {
        (None, Some(fmt::layer().json().with_current_span(true)))
    } else {
        (Some(fmt::layer().with_target(false)), None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json);

    tracing_log::LogTracer::init().map_err(|e| ConfigError::Logging(e.to_string()))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

fn filter_from(env: Option<String>, level: &str) -> Result<EnvFilter, ConfigError> {
    if let Some(directives) = env.filter(|value| !value.trim().is_empty()) {
        match EnvFilter::try_new(&directives) {
            Ok(filter) => return Ok(filter),
            Err(e) => {
                eprintln!("Ignoring invalid RUST_LOG '{}': {}", directives, e);
            }
        }
    }

    EnvFilter::try_new(level).map_err(|e| ConfigError::Logging(format!("'{}': {}", level, e)))
}
