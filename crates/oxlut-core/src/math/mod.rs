//! Mathematical operations for LUT processing
//!
//! This module provides the numeric building blocks shared by the stages:
//! - 3x3 matrix operations for primaries conversion
//! - Chromatic adaptation (Bradford)
//! - Interpolation for grid and curve evaluation

pub mod chromatic_adaptation;
pub mod interpolation;
pub mod matrix;

pub use chromatic_adaptation::{bradford_matrix, xy_to_xyz};
pub use interpolation::{lerp, lut1d_interp, nearest, tetrahedral, trilinear};
pub use matrix::Matrix3x3;
