//! Path helpers for log fields.
//!
//! Staged and exported files live under user directories. Log lines carry the
//! bare file name, or an opaque tag when only the directory matters.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// The file name of `path`, or `<unnamed>` for roots and `..`.
pub fn file_label(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => "<unnamed>".to_string(),
    }
}

/// Sixteen hex digits identifying `path` within this process.
pub fn path_tag(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
