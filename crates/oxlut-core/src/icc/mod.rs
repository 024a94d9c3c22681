//! ICC Profile Codec
//!
//! Byte-exact encoding and decoding of the ICC container for RGB → RGB
//! device-link profiles, following ICC.1:2001-04 (v2.4) for the tags written
//! and ICC.1:2022 for the container.
//!
//! # Structure
//!
//! An ICC profile consists of:
//! 1. A 128-byte header
//! 2. A tag table listing all tags
//! 3. Tag data, 4-byte aligned, identical payloads shared
//!
//! # Example
//!
//! ```ignore
//! use oxlut_core::icc::IccProfile;
//!
//! let profile = IccProfile::parse(&bytes)?;
//! let lut = profile.a2b0().expect("device link carries A2B0");
//! println!("{} grid points", lut.grid_points);
//! ```

pub mod header;
pub mod tags;

mod error;
mod parser;
mod types;
mod writer;

pub use error::IccError;
pub use header::{ColorSpace, IccHeader, ProfileClass, RenderingIntent};
pub use parser::IccProfile;
pub use tags::{Lut16Data, TagData, TextData};
pub use types::{DateTimeNumber, S15Fixed16, TagSignature, TypeSignature};
