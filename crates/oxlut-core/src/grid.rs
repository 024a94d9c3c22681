//! Color grids and the text grid reader
//!
//! A [`ColorGrid`] is a cubic lattice of RGB samples stored in canonical
//! raster order. Two nesting conventions are fixed here as constants:
//!
//! - [`SOURCE_ORDER`]: how rows of a plain sample file are nested
//!   (B outermost, then R, G innermost).
//! - [`RASTER_ORDER`]: the order in which the CLUT and every output format
//!   store samples (B outermost, then G, R innermost).
//!
//! The reader maps each source row to its lattice node, then stably sorts
//! rows on (B, G, R) to obtain raster order.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Color channel / lattice axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    R,
    G,
    B,
}

impl Axis {
    fn slot(self) -> usize {
        match self {
            Axis::R => 0,
            Axis::G => 1,
            Axis::B => 2,
        }
    }
}

/// Axis nesting, outermost first
pub type Nesting = [Axis; 3];

/// Nesting of rows in plain sample files
pub const SOURCE_ORDER: Nesting = [Axis::B, Axis::R, Axis::G];

/// Canonical raster order of grid storage and serialized CLUTs
pub const RASTER_ORDER: Nesting = [Axis::B, Axis::G, Axis::R];

/// Lattice node `[r, g, b]` of the `index`-th entry under `order`
pub fn node_at(order: Nesting, index: usize, size: usize) -> [usize; 3] {
    let mut node = [0; 3];
    let mut rest = index;
    for axis in order.iter().rev() {
        node[axis.slot()] = rest % size;
        rest /= size;
    }
    node
}

/// Position of lattice node `[r, g, b]` under `order`
pub fn index_of(order: Nesting, node: [usize; 3], size: usize) -> usize {
    order
        .iter()
        .fold(0, |acc, axis| acc * size + node[axis.slot()])
}

/// Cubic 3D grid of RGB samples in [`RASTER_ORDER`]
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGrid {
    size: usize,
    samples: Vec<[f64; 3]>,
}

impl ColorGrid {
    /// Smallest usable resolution
    pub const MIN_SIZE: usize = 2;

    /// Grid from samples already in raster order
    pub fn new(size: usize, samples: Vec<[f64; 3]>) -> Result<Self> {
        if size < Self::MIN_SIZE {
            return Err(Error::Dimension(format!(
                "grid resolution {} is below {}",
                size,
                Self::MIN_SIZE
            )));
        }
        let expected = size.checked_pow(3).ok_or_else(|| {
            Error::Dimension(format!("grid resolution {} overflows", size))
        })?;
        if samples.len() != expected {
            return Err(Error::Dimension(format!(
                "{} samples do not fill a {}^3 grid",
                samples.len(),
                size
            )));
        }
        Ok(Self { size, samples })
    }

    /// Grid whose resolution is inferred from the sample count
    pub fn from_samples(samples: Vec<[f64; 3]>) -> Result<Self> {
        let size = cube_root(samples.len())?;
        Self::new(size, samples)
    }

    /// Grid computed from each node's normalized coordinate
    pub fn from_fn(size: usize, f: impl Fn([f64; 3]) -> [f64; 3]) -> Result<Self> {
        let count = size.checked_pow(3).unwrap_or(usize::MAX);
        let samples = if size >= Self::MIN_SIZE {
            (0..count).map(|i| f(normalized(node_at(RASTER_ORDER, i, size), size))).collect()
        } else {
            Vec::new()
        };
        Self::new(size, samples)
    }

    /// Identity mapping: each sample equals its own coordinate
    pub fn identity(size: usize) -> Result<Self> {
        Self::from_fn(size, |c| c)
    }

    /// Points per axis
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total sample count (size³)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[[f64; 3]] {
        &self.samples
    }

    /// Samples as a flat `r, g, b, r, g, b, ...` slice
    pub fn as_flat(&self) -> &[f64] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Raster index of node `(r, g, b)`
    pub fn index(&self, r: usize, g: usize, b: usize) -> usize {
        index_of(RASTER_ORDER, [r, g, b], self.size)
    }

    pub fn get(&self, r: usize, g: usize, b: usize) -> Option<[f64; 3]> {
        if r >= self.size || g >= self.size || b >= self.size {
            return None;
        }
        Some(self.samples[self.index(r, g, b)])
    }

    /// Lattice node of a raster index
    pub fn node(&self, index: usize) -> [usize; 3] {
        node_at(RASTER_ORDER, index, self.size)
    }

    /// Normalized input coordinate of a raster index
    pub fn coordinate(&self, index: usize) -> [f64; 3] {
        normalized(self.node(index), self.size)
    }

    /// New grid with every sample passed through `f`
    pub fn map(&self, mut f: impl FnMut([f64; 3]) -> [f64; 3]) -> Self {
        Self {
            size: self.size,
            samples: self.samples.iter().map(|&s| f(s)).collect(),
        }
    }

    /// Like [`map`](Self::map), with the raster index
    pub fn map_indexed(&self, f: impl Fn(usize, [f64; 3]) -> [f64; 3]) -> Self {
        Self {
            size: self.size,
            samples: self
                .samples
                .iter()
                .enumerate()
                .map(|(i, &s)| f(i, s))
                .collect(),
        }
    }

    /// Largest absolute per-component difference, None if resolutions differ
    pub fn max_abs_diff(&self, other: &Self) -> Option<f64> {
        if self.size != other.size {
            return None;
        }
        Some(
            self.as_flat()
                .iter()
                .zip(other.as_flat())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }
}

fn normalized(node: [usize; 3], size: usize) -> [f64; 3] {
    let max = (size - 1) as f64;
    node.map(|v| v as f64 / max)
}

/// Resolution N with N³ == count
pub fn cube_root(count: usize) -> Result<usize> {
    let n = (count as f64).cbrt().round() as usize;
    if n.checked_pow(3) != Some(count) {
        return Err(Error::Dimension(format!(
            "sample count {} is not a perfect cube",
            count
        )));
    }
    Ok(n)
}

/// Parses whitespace-separated sample rows into a [`ColorGrid`]
///
/// Rows with 3 to 5 columns are output samples whose input coordinates are
/// implied by [`SOURCE_ORDER`]. Rows with 6 or more columns carry the input
/// coordinate first (R G B in [0, 1]) and the output sample next, in any row
/// order. Blank lines and `#` comments are skipped.
#[derive(Debug, Clone)]
pub struct GridReader {
    snap_tolerance: f64,
}

impl Default for GridReader {
    fn default() -> Self {
        Self {
            snap_tolerance: 1e-4,
        }
    }
}

/// One parsed row: lattice node and output sample
type Row = ([usize; 3], [f64; 3]);

impl GridReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allowed distance from a lattice node, in grid steps
    pub fn with_snap_tolerance(mut self, tolerance: f64) -> Self {
        self.snap_tolerance = tolerance;
        self
    }

    /// Read and parse a sample file
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<ColorGrid> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = text.len(), "read grid text");
        self.parse_str(&text)
    }

    /// Parse sample rows
    pub fn parse_str(&self, text: &str) -> Result<ColorGrid> {
        let mut values: Vec<(usize, Vec<f64>)> = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<f64>().map_err(|_| {
                        Error::Format(format!("line {}: '{}' is not a number", line_no + 1, tok))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            values.push((line_no + 1, row));
        }

        let Some((_, first)) = values.first() else {
            return Err(Error::Dimension("grid file has no samples".to_string()));
        };
        let explicit = first.len() >= 6;
        for (line, row) in &values {
            if row.len() < 3 {
                return Err(Error::Format(format!(
                    "line {}: expected at least 3 columns, found {}",
                    line,
                    row.len()
                )));
            }
            if (row.len() >= 6) != explicit {
                return Err(Error::Format(format!(
                    "line {}: mixes coordinate and sample-only rows",
                    line
                )));
            }
        }

        let size = cube_root(values.len())?;
        if size < ColorGrid::MIN_SIZE {
            return Err(Error::Dimension(format!(
                "{} sample(s) cannot form a grid",
                values.len()
            )));
        }
        debug!(size, rows = values.len(), explicit, "parsed grid rows");

        let mut rows: Vec<Row> = if explicit {
            values
                .iter()
                .map(|(line, row)| {
                    let node = self.snap([row[0], row[1], row[2]], size, *line)?;
                    Ok((node, [row[3], row[4], row[5]]))
                })
                .collect::<Result<_>>()?
        } else {
            values
                .iter()
                .enumerate()
                .map(|(n, (_, row))| (node_at(SOURCE_ORDER, n, size), [row[0], row[1], row[2]]))
                .collect()
        };

        // Duplicate nodes are rejected below
        rows.sort_by_key(|(node, _)| index_of(RASTER_ORDER, *node, size));

        for (expected, (node, _)) in rows.iter().enumerate() {
            let found = index_of(RASTER_ORDER, *node, size);
            if found != expected {
                return Err(Error::Format(format!(
                    "grid node {:?} appears more than once",
                    node
                )));
            }
        }

        ColorGrid::new(size, rows.into_iter().map(|(_, sample)| sample).collect())
    }

    fn snap(&self, coord: [f64; 3], size: usize, line: usize) -> Result<[usize; 3]> {
        let max = (size - 1) as f64;
        let mut node = [0; 3];
        for (slot, &c) in node.iter_mut().zip(&coord) {
            let scaled = c * max;
            let nearest = scaled.round();
            if !(0.0..=max).contains(&nearest) || (scaled - nearest).abs() > self.snap_tolerance
            {
                return Err(Error::Format(format!(
                    "line {}: coordinate {:?} is not on a {}^3 lattice node",
                    line, coord, size
                )));
            }
            *slot = nearest as usize;
        }
        Ok(node)
    }
}
