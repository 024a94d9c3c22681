//! In-memory 3D LUT with shaper curves
//!
//! [`Lut3d`] is the decoded form of an `mft2` tag: per-channel input
//! curves, a [`ColorGrid`], and per-channel output curves. The 3×3 matrix of
//! the tag only applies to XYZ input and is not carried.

use tracing::warn;

use crate::curve::{Curve1d, quantize_u16};
use crate::error::{Error, Result};
use crate::grid::ColorGrid;
use crate::icc::tags::{IDENTITY_MATRIX, MAX_TABLE_ENTRIES};
use crate::icc::{ColorSpace, IccProfile, Lut16Data};
use crate::math::trilinear;

/// Largest grid a lut16 tag can hold (u8 grid-point field)
pub const MAX_ICC_GRID_POINTS: usize = u8::MAX as usize;

/// Input curves → grid → output curves
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3d {
    pub input_curves: [Curve1d; 3],
    pub grid: ColorGrid,
    pub output_curves: [Curve1d; 3],
}

impl Lut3d {
    /// Grid with identity curves
    pub fn from_grid(grid: ColorGrid) -> Self {
        Self {
            input_curves: Default::default(),
            grid,
            output_curves: Default::default(),
        }
    }

    /// Decode the A2B0 tag of an RGB → RGB profile
    pub fn from_profile(profile: &IccProfile) -> Result<Self> {
        let header = &profile.header;
        if header.color_space != ColorSpace::Rgb || header.pcs != ColorSpace::Rgb {
            return Err(Error::Format(format!(
                "expected an RGB -> RGB profile, found {:?} -> {:?}",
                header.color_space, header.pcs
            )));
        }
        let lut = profile
            .a2b0()
            .ok_or_else(|| Error::Format("profile has no lut16 A2B0 tag".to_string()))?;
        Self::from_lut16(lut)
    }

    /// Decode a lut16 payload with 3 inputs and 3 outputs
    pub fn from_lut16(lut: &Lut16Data) -> Result<Self> {
        if lut.input_channels != 3 || lut.output_channels != 3 {
            return Err(Error::Format(format!(
                "expected a 3 -> 3 channel LUT, found {} -> {}",
                lut.input_channels, lut.output_channels
            )));
        }
        if !lut.matrix_is_identity() {
            warn!("ignoring non-identity lut16 matrix on RGB input");
        }

        let samples = lut
            .clut
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]].map(|v| v as f64 / 65535.0))
            .collect();
        let grid = ColorGrid::new(lut.grid_points as usize, samples)?;

        let curves = |tables: &[Vec<u16>]| -> Result<[Curve1d; 3]> {
            Ok([
                Curve1d::from_u16(&tables[0])?,
                Curve1d::from_u16(&tables[1])?,
                Curve1d::from_u16(&tables[2])?,
            ])
        };

        Ok(Self {
            input_curves: curves(&lut.input_curves)?,
            grid,
            output_curves: curves(&lut.output_curves)?,
        })
    }

    /// Encode as a lut16 payload
    ///
    /// Fails with a validation error when the grid or curves exceed what the
    /// tag can represent.
    pub fn to_lut16(&self) -> Result<Lut16Data> {
        let grid_points = icc_grid_points(self.grid.size())?;

        let clut = self
            .grid
            .as_flat()
            .iter()
            .map(|&v| quantize_u16(v))
            .collect();

        Ok(Lut16Data {
            input_channels: 3,
            output_channels: 3,
            grid_points,
            matrix: IDENTITY_MATRIX,
            input_curves: uniform_tables(&self.input_curves)?,
            clut,
            output_curves: uniform_tables(&self.output_curves)?,
        })
    }

    pub fn has_identity_curves(&self) -> bool {
        self.input_curves
            .iter()
            .chain(&self.output_curves)
            .all(|c| c.is_identity(0.0))
    }

    /// Evaluate the full chain at a normalized input
    pub fn eval(&self, rgb: [f64; 3]) -> [f64; 3] {
        let max = (self.grid.size() - 1) as f64;
        let p = [0, 1, 2].map(|c| self.input_curves[c].eval(rgb[c]) * max);
        self.apply_output(trilinear(self.grid.samples(), self.grid.size(), p))
    }

    fn apply_output(&self, v: [f64; 3]) -> [f64; 3] {
        [0, 1, 2].map(|c| self.output_curves[c].eval(v[c]))
    }

    /// Fold the curves into a plain grid at the same resolution
    ///
    /// With identity input curves the nodes are read directly; identity
    /// curves everywhere return the grid unchanged.
    pub fn bake(&self) -> ColorGrid {
        if self.has_identity_curves() {
            return self.grid.clone();
        }
        if self.input_curves.iter().all(|c| c.is_identity(0.0)) {
            return self.grid.map(|v| self.apply_output(v));
        }
        self.grid
            .map_indexed(|i, _| self.eval(self.grid.coordinate(i)))
    }
}

/// Grid resolution as the u8 grid-point field of a lut16 tag
pub fn icc_grid_points(size: usize) -> Result<u8> {
    if size > MAX_ICC_GRID_POINTS {
        return Err(Error::Validation(format!(
            "grid resolution {} exceeds the ICC limit of {} points",
            size, MAX_ICC_GRID_POINTS
        )));
    }
    Ok(size as u8)
}

/// Curves resampled to a common length and quantized to u16
fn uniform_tables(curves: &[Curve1d; 3]) -> Result<Vec<Vec<u16>>> {
    let entries = curves.iter().map(Curve1d::len).max().unwrap_or(2);
    if entries > MAX_TABLE_ENTRIES {
        return Err(Error::Validation(format!(
            "curve with {} entries exceeds the ICC limit of {}",
            entries, MAX_TABLE_ENTRIES
        )));
    }
    Ok(curves
        .iter()
        .map(|c| c.compose(&Curve1d::identity(), entries).to_u16())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lut16_roundtrip_within_quantization() {
        let grid = ColorGrid::from_fn(5, |[r, g, b]| [g, b * 0.5, r * r]).unwrap();
        let lut = Lut3d::from_grid(grid.clone());

        let encoded = lut.to_lut16().unwrap();
        assert_eq!(encoded.grid_points, 5);
        assert_eq!(encoded.clut.len(), 125 * 3);
        assert_eq!(encoded.input_curves, vec![vec![0, 65535]; 3]);

        let back = Lut3d::from_lut16(&encoded).unwrap();
        let diff = back.grid.max_abs_diff(&grid).unwrap();
        assert!(diff <= 0.5 / 65535.0 + 1e-12, "diff {}", diff);
    }

    #[test]
    fn test_rejects_oversized_grid() {
        assert_eq!(icc_grid_points(255).unwrap(), 255);
        assert!(matches!(icc_grid_points(256), Err(Error::Validation(_))));
    }

    #[test]
    fn test_uneven_curves_are_resampled() {
        let mut lut = Lut3d::from_grid(ColorGrid::identity(2).unwrap());
        lut.output_curves[1] = Curve1d::sampled(9, |x| x.sqrt()).unwrap();

        let encoded = lut.to_lut16().unwrap();
        assert!(encoded.output_curves.iter().all(|t| t.len() == 9));
        assert_eq!(encoded.output_curves[0][4], 32768);
    }

    #[test]
    fn test_bake_applies_output_curves() {
        let mut lut = Lut3d::from_grid(ColorGrid::identity(3).unwrap());
        assert_eq!(lut.bake(), lut.grid);

        lut.output_curves[0] = Curve1d::sampled(2, |x| 1.0 - x).unwrap();
        let baked = lut.bake();
        assert_eq!(baked.get(2, 0, 0), Some([0.0, 0.0, 0.0]));
        assert_eq!(baked.get(0, 2, 2), Some([1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_bake_applies_input_curves() {
        let mut lut = Lut3d::from_grid(ColorGrid::identity(3).unwrap());
        lut.input_curves[2] = Curve1d::sampled(2, |x| 0.5 * x).unwrap();
        let baked = lut.bake();
        let top = baked.get(0, 0, 2).unwrap();
        assert!((top[2] - 0.5).abs() < 1e-12);
    }
}
