//! # lut-tests
//!
//! Integration tests for oxlut.
//!
//! This crate provides:
//! - Deterministic grid patterns (seeded random, gamma, channel swaps)
//! - Grid comparison statistics
//! - Fixture writers for the text formats the pipeline reads
//!
//! ## Test Categories
//!
//! 1. **Codec**: device-link encode/decode, tag interning, malformed input
//! 2. **Resampling**: identity, node alignment, interpolation modes, abort
//! 3. **Scenarios**: end-to-end pipeline runs
//! 4. **Files**: `.cube`, `3DLT` and `.cal` handling

pub mod accuracy;
pub mod fixtures;
pub mod patterns;

pub use accuracy::{GridDiffStats, compare_grids};
pub use patterns::{GridPattern, generate_grid};
