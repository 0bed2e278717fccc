//! Test harness for isolated pipeline runs.
//!
//! Each harness owns a temporary directory holding the input files, the
//! staging area and export targets, plus a [`MemoryEngine`] behind a
//! [`JobRegistry`].

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use dataops::{JobRegistry, MemoryEngine, PipelineController, SourceFile, StagingArea};

pub struct TestHarness {
    temp_dir: TempDir,
    /// Where test inputs are written before import.
    pub input_dir: PathBuf,
    /// Staging directory handed to the controller.
    pub staging_dir: PathBuf,
    /// Directory for export targets.
    pub output_dir: PathBuf,
    pub engine: Arc<MemoryEngine>,
    pub registry: Arc<JobRegistry>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_engine(MemoryEngine::new())
    }

    /// Builds a harness around a preconfigured engine.
    pub fn with_engine(engine: MemoryEngine) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let input_dir = base.join("input");
        let staging_dir = base.join("uploads");
        let output_dir = base.join("output");

        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        let engine = Arc::new(engine);
        let registry = Arc::new(JobRegistry::new(engine.clone()));

        Self {
            temp_dir,
            input_dir,
            staging_dir,
            output_dir,
            engine,
            registry,
        }
    }

    pub fn controller(&self) -> PipelineController {
        PipelineController::new(
            Arc::clone(&self.registry),
            StagingArea::new(&self.staging_dir),
        )
    }

    /// Writes an input file and returns a source pointing at it.
    pub fn input(&self, name: &str, content: &str) -> SourceFile {
        let path = self.input_dir.join(name);
        std::fs::write(&path, content).expect("Failed to write input file");
        SourceFile::path(path)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn base_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
