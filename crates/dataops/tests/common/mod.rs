//! Shared test utilities for dataops integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs against an in-memory engine
//! - Builders for engine records and scripted engine responses

pub mod builders;
pub mod harness;

#[allow(unused_imports)]
pub use builders::*;
pub use harness::TestHarness;
