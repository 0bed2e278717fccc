use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::config::schema::Config;
use crate::error::ConfigError;

const MIN_POLL_INTERVAL_MS: u64 = 100;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.polling.interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::Validation {
            message: format!(
                "polling.intervalMs must be at least {} (got {})",
                MIN_POLL_INTERVAL_MS, config.polling.interval_ms
            ),
        });
    }

    if config.processing.job_name_prefix.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "processing.jobNamePrefix must not be empty".to_string(),
        });
    }

    if config.processing.timeout_secs == Some(0) {
        return Err(ConfigError::Validation {
            message: "processing.timeoutSecs must be greater than zero".to_string(),
        });
    }

    if let Err(e) = EnvFilter::try_new(&config.logging.level) {
        return Err(ConfigError::Validation {
            message: format!("Invalid logging.level '{}': {}", config.logging.level, e),
        });
    }

    Ok(())
}
