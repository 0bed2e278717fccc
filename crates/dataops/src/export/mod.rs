//! Export of processed jobs to a user-chosen file.

mod format;
mod service;

pub use format::ExportFormat;
pub use service::{ExportOutcome, ExportService, FixedPath, SaveDialog, SaveRequest};
