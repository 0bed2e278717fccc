use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Shape of an export artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    /// One JSON record per chunk, newline separated.
    #[default]
    #[serde(rename = "jsonl", alias = "lines")]
    Lines,
    /// One comma-separated row per file.
    #[serde(rename = "csv", alias = "table")]
    Table,
    #[serde(rename = "md", alias = "markdown")]
    Markdown,
}

impl ExportFormat {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ExportFormat::Lines => "jsonl",
            ExportFormat::Table => "csv",
            ExportFormat::Markdown => "md",
        }
    }

    /// File extension proposed in the save dialog.
    pub fn extension(&self) -> &'static str {
        self.wire_name()
    }

    pub fn filter_name(&self) -> &'static str {
        match self {
            ExportFormat::Lines => "JSON Lines",
            ExportFormat::Table => "CSV",
            ExportFormat::Markdown => "Markdown",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "lines" => Ok(ExportFormat::Lines),
            "csv" | "table" => Ok(ExportFormat::Table),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}
