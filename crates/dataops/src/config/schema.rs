use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::export::ExportFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            staging: StagingConfig::default(),
            polling: PollingConfig::default(),
            processing: ProcessingConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingConfig {
    /// Overrides `<platform data dir>/dataops/uploads`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub job_limit: Option<u32>,
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            job_limit: None,
            auto_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingConfig {
    #[serde(default = "default_job_name_prefix")]
    pub job_name_prefix: String,
    /// Client-side deadline for processing calls; absent means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_job_name_prefix() -> String {
    "Data Processing".to_string()
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            job_name_prefix: default_job_name_prefix(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    #[serde(default)]
    pub default_format: ExportFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
