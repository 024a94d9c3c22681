//! # oxlut - 3D LUT codec and grid resampler
//!
//! Turns a sampled 3D color lookup table into an RGB → RGB ICC device link,
//! resamples LUTs between grid resolutions, and applies primaries
//! conversion, video levels and calibration curves on the way.
//!
//! ## Stages
//!
//! - [`GridReader`] parses text sample rows into a [`ColorGrid`]
//! - [`DeviceLinkBuilder`] wraps a grid in a device-link [`IccProfile`]
//! - [`IccProfile::parse`] / [`IccProfile::encode`] are the binary codec
//! - [`GridResampler`] changes the grid resolution
//! - [`ColorspaceTransform`] applies a primaries matrix and video levels
//! - [`CalibrationAppender`] folds per-channel calibration into the curves
//!
//! [`Pipeline`] runs all of them from a [`ConvertOptions`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use oxlut_core::{ColorGrid, DeviceLinkBuilder, GridResampler, Lut3d};
//!
//! let grid = ColorGrid::identity(17)?;
//! let large = GridResampler::new(65).resample(&grid)?;
//! let icc = DeviceLinkBuilder::new()
//!     .with_description("Identity")
//!     .encode(&Lut3d::from_grid(large))?;
//! std::fs::write("identity.icc", icc)?;
//! # Ok::<(), oxlut_core::Error>(())
//! ```
//!
//! ## Ordering
//!
//! Grids are stored B slowest, G middle, R fastest ([`RASTER_ORDER`]); the
//! CLUT, `.cube` and `3DLT` outputs all use this order. Plain sample files
//! nest B, then R, then G ([`SOURCE_ORDER`]).

pub mod abort;
pub mod calibration;
pub mod colorspace;
pub mod config;
pub mod curve;
pub mod devicelink;
pub mod error;
pub mod grid;
pub mod icc;
pub mod lut3d;
pub mod lut_file;
pub mod math;
pub mod pipeline;
pub mod resample;

pub use abort::AbortSignal;
pub use calibration::{CalibrationAppender, CalibrationCurve, InsertionPoint};
pub use colorspace::{ColorspaceTransform, LevelMapping, Primaries};
pub use config::ConvertOptions;
pub use curve::Curve1d;
pub use devicelink::DeviceLinkBuilder;
pub use error::{Error, ErrorKind, Result};
pub use grid::{ColorGrid, GridReader, RASTER_ORDER, SOURCE_ORDER};
pub use icc::{IccError, IccProfile, RenderingIntent};
pub use lut3d::Lut3d;
pub use lut_file::{BinaryLut, CubeFile, LutFormat};
pub use pipeline::{ConvertReport, Pipeline};
pub use resample::{GridResampler, Interpolation};

/// Version of oxlut
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
