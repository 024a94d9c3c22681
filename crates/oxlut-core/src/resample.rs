//! Grid resampling
//!
//! [`GridResampler`] maps a grid of resolution Ns onto Nt points per axis.
//! Target node i on any axis sits at source position `i·(Ns−1)/(Nt−1)`,
//! clamped to the source lattice. The enclosing source cell is then
//! interpolated.
//!
//! The target is split into contiguous chunks of raster indices. Chunks run
//! on the rayon pool, each writing only its own slice of the output and
//! reading the shared source. The abort signal is polled before every
//! chunk, so a raised signal stops the pass within one chunk per worker.

use std::fmt;
use std::str::FromStr;

use multiversion::multiversion;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::colorspace::{LevelMapping, clamp_unit};
use crate::error::{Error, Result};
use crate::grid::{ColorGrid, RASTER_ORDER, node_at};
use crate::math::{nearest, tetrahedral, trilinear};

/// Samples per work unit
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Interpolation between source nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// 8-node weighted average
    #[default]
    Trilinear,
    /// 4-node, tetrahedron along the neutral axis
    Tetrahedral,
    /// Closest node, halves round up
    Nearest,
}

impl Interpolation {
    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Trilinear => "trilinear",
            Interpolation::Tetrahedral => "tetrahedral",
            Interpolation::Nearest => "nearest",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trilinear" => Ok(Interpolation::Trilinear),
            "tetrahedral" => Ok(Interpolation::Tetrahedral),
            "nearest" => Ok(Interpolation::Nearest),
            _ => Err(Error::Config(format!("unknown interpolation '{}'", s))),
        }
    }
}

/// Resamples a [`ColorGrid`] to a new resolution
#[derive(Debug, Clone)]
pub struct GridResampler {
    target_size: usize,
    interpolation: Interpolation,
    chunk_size: usize,
    parallel: bool,
    input_levels: Option<LevelMapping>,
    abort: Option<AbortSignal>,
}

impl GridResampler {
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size,
            interpolation: Interpolation::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel: true,
            input_levels: None,
            abort: None,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Samples per work unit; 0 is treated as 1
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run chunks on the rayon pool (default) or in order on this thread
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Remap target coordinates before locating the source cell
    ///
    /// With `VideoToFull`, target inputs are video-range values addressing a
    /// full-range source.
    pub fn with_input_levels(mut self, mapping: LevelMapping) -> Self {
        self.input_levels = Some(mapping);
        self
    }

    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Source position of every target node along one axis
    fn positions(&self, source_size: usize) -> Vec<f64> {
        let nt = self.target_size;
        let span = (source_size - 1) as f64;
        (0..nt)
            .map(|i| match self.input_levels {
                // Integer numerator keeps node-aligned positions exact
                None => (i * (source_size - 1)) as f64 / (nt - 1) as f64,
                Some(mapping) => clamp_unit(mapping.apply(i as f64 / (nt - 1) as f64)) * span,
            })
            .collect()
    }

    fn check_abort(&self) -> Result<()> {
        match &self.abort {
            Some(signal) => signal.check(),
            None => Ok(()),
        }
    }

    /// Produce the resampled grid; the source is left untouched
    pub fn resample(&self, source: &ColorGrid) -> Result<ColorGrid> {
        if self.target_size < ColorGrid::MIN_SIZE {
            return Err(Error::Dimension(format!(
                "target resolution {} is below {}",
                self.target_size,
                ColorGrid::MIN_SIZE
            )));
        }
        self.check_abort()?;

        let ns = source.size();
        let nt = self.target_size;
        if nt == ns && self.input_levels.is_none() {
            debug!(size = ns, "resample to same size is the identity");
            return Ok(source.clone());
        }

        let total = nt.checked_pow(3).ok_or_else(|| {
            Error::Dimension(format!("target resolution {} overflows", nt))
        })?;
        info!(
            from = ns,
            to = nt,
            interpolation = %self.interpolation,
            chunks = total.div_ceil(self.chunk_size),
            "resampling grid"
        );

        let positions = self.positions(ns);
        let src = source.samples();
        let result = match self.interpolation {
            Interpolation::Trilinear => self.fill(&positions, |p| trilinear(src, ns, p)),
            Interpolation::Tetrahedral => self.fill(&positions, |p| tetrahedral(src, ns, p)),
            Interpolation::Nearest => self.fill(&positions, |p| nearest(src, ns, p)),
        };
        match result {
            Ok(out) => ColorGrid::new(nt, out),
            Err(err) => {
                warn!(from = ns, to = nt, "resampling aborted");
                Err(err)
            }
        }
    }

    /// Evaluate `sample` at every target node, chunk by chunk
    fn fill<F>(&self, positions: &[f64], sample: F) -> Result<Vec<[f64; 3]>>
    where
        F: Fn([f64; 3]) -> [f64; 3] + Sync,
    {
        let nt = positions.len();
        let mut out = vec![[0.0f64; 3]; nt * nt * nt];

        let run = |(chunk_index, chunk): (usize, &mut [[f64; 3]])| -> Result<()> {
            self.check_abort()?;
            resample_chunk(positions, chunk_index * self.chunk_size, chunk, &sample);
            Ok(())
        };

        if self.parallel {
            out.par_chunks_mut(self.chunk_size)
                .enumerate()
                .try_for_each(run)?;
        } else {
            out.chunks_mut(self.chunk_size).enumerate().try_for_each(run)?;
        }
        Ok(out)
    }
}

/// Fill `out` with target samples starting at raster index `start`
#[multiversion(targets("x86_64+avx2", "x86_64+sse4.1", "aarch64+neon",))]
fn resample_chunk<F>(positions: &[f64], start: usize, out: &mut [[f64; 3]], sample: F)
where
    F: Fn([f64; 3]) -> [f64; 3],
{
    let nt = positions.len();
    for (offset, value) in out.iter_mut().enumerate() {
        let [r, g, b] = node_at(RASTER_ORDER, start + offset, nt);
        *value = sample([positions[r], positions[g], positions[b]]);
    }
}
