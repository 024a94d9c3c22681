//! Per-channel 1D curves
//!
//! A [`Curve1d`] is a table sampled uniformly over [0, 1] and evaluated with
//! linear interpolation. These are the input/output curves of a LUT tag and
//! the carrier for calibration.

use crate::error::{Error, Result};
use crate::math::lut1d_interp;

/// Uniformly sampled 1D curve over [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Curve1d {
    table: Vec<f64>,
}

impl Default for Curve1d {
    fn default() -> Self {
        Self::identity()
    }
}

impl Curve1d {
    /// The two-point identity curve
    pub fn identity() -> Self {
        Self {
            table: vec![0.0, 1.0],
        }
    }

    /// Curve from a uniformly sampled table; needs at least 2 finite entries
    pub fn from_table(table: Vec<f64>) -> Result<Self> {
        if table.len() < 2 {
            return Err(Error::Validation(format!(
                "curve needs at least 2 entries, got {}",
                table.len()
            )));
        }
        if let Some(bad) = table.iter().find(|v| !v.is_finite()) {
            return Err(Error::Validation(format!("curve entry {} is not finite", bad)));
        }
        Ok(Self { table })
    }

    /// Curve from a 16-bit ICC table (0..=65535 → 0.0..=1.0)
    pub fn from_u16(table: &[u16]) -> Result<Self> {
        Self::from_table(table.iter().map(|&v| v as f64 / 65535.0).collect())
    }

    /// Curve sampled from a function at `entries` uniform points
    pub fn sampled(entries: usize, f: impl Fn(f64) -> f64) -> Result<Self> {
        let max = entries.saturating_sub(1).max(1) as f64;
        Self::from_table((0..entries).map(|i| f(i as f64 / max)).collect())
    }

    /// Evaluate at x; inputs outside [0, 1] take the end values
    pub fn eval(&self, x: f64) -> f64 {
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        lut1d_interp(&self.table, x)
    }

    pub fn table(&self) -> &[f64] {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        let max = (self.table.len() - 1) as f64;
        self.table
            .iter()
            .enumerate()
            .all(|(i, v)| (v - i as f64 / max).abs() <= epsilon)
    }

    /// Non-decreasing check, returns the first offending index
    pub fn first_decrease(&self) -> Option<usize> {
        self.table.windows(2).position(|w| w[1] < w[0]).map(|i| i + 1)
    }

    /// `self ∘ inner`: x ↦ self(inner(x)), sampled at `entries` points
    pub fn compose(&self, inner: &Curve1d, entries: usize) -> Curve1d {
        if inner.is_identity(0.0) && self.len() == entries {
            return self.clone();
        }
        if self.is_identity(0.0) && inner.len() == entries {
            return inner.clone();
        }
        let max = (entries.max(2) - 1) as f64;
        Curve1d {
            table: (0..entries.max(2))
                .map(|i| self.eval(inner.eval(i as f64 / max)))
                .collect(),
        }
    }

    /// Quantize to a 16-bit table: round(v × 65535) clamped
    pub fn to_u16(&self) -> Vec<u16> {
        self.table.iter().map(|&v| quantize_u16(v)).collect()
    }
}

/// round(v × 65535) clamped to [0, 65535]; NaN becomes 0
pub fn quantize_u16(v: f64) -> u16 {
    if v.is_nan() {
        return 0;
    }
    (v * 65535.0).round().clamp(0.0, 65535.0) as u16
}
