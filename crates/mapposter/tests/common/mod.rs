//! Shared test utilities for mapposter integration tests.
//!
//! This module provides:
//! - Fake collaborators (geocoder, theme catalog, renderer) with call
//!   counting and scripted failures
//! - `TestHarness` wiring a `PosterService` to an isolated temp directory

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
