//! Primaries conversion and video levels
//!
//! [`ColorspaceTransform`] multiplies every grid sample by the 3×3 matrix of
//! a named set of primaries, optionally rescales to or from video levels,
//! and clamps the result to [0, 1].
//!
//! Primaries matrices convert linear RGB in the named primaries to linear
//! RGB in BT.709, with Bradford adaptation when the white points differ.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::grid::ColorGrid;
use crate::math::{Matrix3x3, bradford_matrix, xy_to_xyz};

/// CIE xy of the three primaries and the white point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticities {
    pub red: [f64; 2],
    pub green: [f64; 2],
    pub blue: [f64; 2],
    pub white: [f64; 2],
}

const D65: [f64; 2] = [0.3127, 0.3290];

/// Named RGB primaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primaries {
    Bt709,
    SmpteC,
    EbuPal,
    Bt2020,
    DciP3,
}

impl Primaries {
    pub const ALL: [Primaries; 5] = [
        Primaries::Bt709,
        Primaries::SmpteC,
        Primaries::EbuPal,
        Primaries::Bt2020,
        Primaries::DciP3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Primaries::Bt709 => "BT709",
            Primaries::SmpteC => "SMPTE_C",
            Primaries::EbuPal => "EBU_PAL",
            Primaries::Bt2020 => "BT2020",
            Primaries::DciP3 => "DCI_P3",
        }
    }

    /// Case-insensitive lookup; `-`, `_`, `.` and spaces are ignored
    pub fn from_name(name: &str) -> Result<Self> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '.' | ' '))
            .flat_map(char::to_uppercase)
            .collect();
        match key.as_str() {
            "BT709" | "REC709" => Ok(Primaries::Bt709),
            "SMPTEC" => Ok(Primaries::SmpteC),
            "EBUPAL" | "EBU" => Ok(Primaries::EbuPal),
            "BT2020" | "REC2020" => Ok(Primaries::Bt2020),
            "DCIP3" => Ok(Primaries::DciP3),
            _ => Err(Error::Config(format!(
                "unknown colorspace '{}' (expected one of {})",
                name,
                Self::ALL.map(|p| p.name()).join(", ")
            ))),
        }
    }

    pub fn chromaticities(&self) -> Chromaticities {
        match self {
            Primaries::Bt709 => Chromaticities {
                red: [0.640, 0.330],
                green: [0.300, 0.600],
                blue: [0.150, 0.060],
                white: D65,
            },
            Primaries::SmpteC => Chromaticities {
                red: [0.630, 0.340],
                green: [0.310, 0.595],
                blue: [0.155, 0.070],
                white: D65,
            },
            Primaries::EbuPal => Chromaticities {
                red: [0.640, 0.330],
                green: [0.290, 0.600],
                blue: [0.150, 0.060],
                white: D65,
            },
            Primaries::Bt2020 => Chromaticities {
                red: [0.708, 0.292],
                green: [0.170, 0.797],
                blue: [0.131, 0.046],
                white: D65,
            },
            Primaries::DciP3 => Chromaticities {
                red: [0.680, 0.320],
                green: [0.265, 0.690],
                blue: [0.150, 0.060],
                white: [0.314, 0.351],
            },
        }
    }

    /// Linear RGB → XYZ (Y of white = 1)
    pub fn rgb_to_xyz(&self) -> Result<Matrix3x3> {
        let c = self.chromaticities();
        let m = Matrix3x3::from_columns(xy_to_xyz(c.red), xy_to_xyz(c.green), xy_to_xyz(c.blue));
        let s = m
            .inverse()
            .ok_or_else(|| Error::Validation(format!("{} primaries are degenerate", self)))?
            .multiply_vec(xy_to_xyz(c.white));
        Ok(m.multiply(&Matrix3x3::diagonal(s[0], s[1], s[2])))
    }

    /// Linear RGB in these primaries → linear RGB in BT.709
    pub fn to_bt709(&self) -> Result<Matrix3x3> {
        if *self == Primaries::Bt709 {
            return Ok(Matrix3x3::identity());
        }
        let src_white = xy_to_xyz(self.chromaticities().white);
        let adapt = bradford_matrix(src_white, xy_to_xyz(D65));
        let xyz_to_709 = Primaries::Bt709
            .rgb_to_xyz()?
            .inverse()
            .ok_or_else(|| Error::Validation("BT709 primaries are degenerate".to_string()))?;
        Ok(xyz_to_709.multiply(&adapt.multiply(&self.rgb_to_xyz()?)))
    }
}

impl fmt::Display for Primaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Primaries {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Direction of a video/full range rescale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelMapping {
    /// 0–255 → 16–235
    FullToVideo,
    /// 16–235 → 0–255
    VideoToFull,
}

impl LevelMapping {
    /// Rescale one normalized value, unclamped
    #[inline]
    pub fn apply(self, v: f64) -> f64 {
        match self {
            LevelMapping::FullToVideo => (16.0 + 219.0 * v) / 255.0,
            LevelMapping::VideoToFull => (255.0 * v - 16.0) / 219.0,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            LevelMapping::FullToVideo => LevelMapping::VideoToFull,
            LevelMapping::VideoToFull => LevelMapping::FullToVideo,
        }
    }
}

/// Clamp to [0, 1], NaN to 0
#[inline]
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Matrix, then optional level rescale, then clamp
#[derive(Debug, Clone, Default)]
pub struct ColorspaceTransform {
    matrix: Option<Matrix3x3>,
    levels: Option<LevelMapping>,
}

impl ColorspaceTransform {
    /// Clamp only
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform for a primaries name; `inverse` converts from BT.709 instead
    pub fn from_name(name: &str, inverse: bool) -> Result<Self> {
        Self::new().with_primaries(Primaries::from_name(name)?, inverse)
    }

    pub fn with_primaries(self, primaries: Primaries, inverse: bool) -> Result<Self> {
        let matrix = primaries.to_bt709()?;
        let matrix = if inverse {
            matrix.inverse().ok_or_else(|| {
                Error::Validation(format!("{} matrix is not invertible", primaries))
            })?
        } else {
            matrix
        };
        Ok(self.with_matrix(matrix))
    }

    pub fn with_matrix(mut self, matrix: Matrix3x3) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Rescale output values after the matrix
    pub fn with_levels(mut self, mapping: LevelMapping) -> Self {
        self.levels = Some(mapping);
        self
    }

    pub fn matrix(&self) -> Option<&Matrix3x3> {
        self.matrix.as_ref()
    }

    fn unclamped(&self, sample: [f64; 3]) -> [f64; 3] {
        let v = match &self.matrix {
            Some(m) => m.multiply_vec(sample),
            None => sample,
        };
        match self.levels {
            Some(mapping) => v.map(|c| mapping.apply(c)),
            None => v,
        }
    }

    /// Transform a single sample
    pub fn apply(&self, sample: [f64; 3]) -> [f64; 3] {
        self.unclamped(sample).map(clamp_unit)
    }

    /// Transform every sample into a new grid
    pub fn apply_grid(&self, grid: &ColorGrid) -> ColorGrid {
        let (out, clamped) = self.transform_grid(grid);
        if clamped > 0 {
            warn!(clamped, total = grid.len(), "clamped out-of-range samples");
        }
        debug!(
            matrix = self.matrix.is_some(),
            levels = ?self.levels,
            "applied colorspace transform"
        );
        out
    }

    /// New grid plus the number of samples that needed clamping
    fn transform_grid(&self, grid: &ColorGrid) -> (ColorGrid, usize) {
        let mut clamped = 0;
        let out = grid.map(|s| {
            let v = self.unclamped(s);
            if v.iter().any(|c| !(0.0..=1.0).contains(c)) {
                clamped += 1;
            }
            v.map(clamp_unit)
        });
        (out, clamped)
    }
}
