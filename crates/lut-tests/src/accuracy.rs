//! Grid comparison

use oxlut_core::ColorGrid;

/// One 16-bit code value
pub const CODE_VALUE: f64 = 1.0 / 65535.0;

/// Per-component absolute differences between two grids
#[derive(Debug, Clone)]
pub struct GridDiffStats {
    /// Mean difference across all components
    pub mean: f64,
    /// Maximum difference
    pub max: f64,
    /// 95th percentile difference
    pub p95: f64,
    /// Number of compared components
    pub count: usize,
}

impl GridDiffStats {
    /// Every component within half a 16-bit code value
    pub fn is_exact_u16(&self) -> bool {
        self.max <= CODE_VALUE / 2.0 + 1e-12
    }
}

/// Compare two grids of the same resolution
pub fn compare_grids(a: &ColorGrid, b: &ColorGrid) -> Option<GridDiffStats> {
    if a.size() != b.size() {
        return None;
    }
    let mut diffs: Vec<f64> = a
        .as_flat()
        .iter()
        .zip(b.as_flat())
        .map(|(x, y)| (x - y).abs())
        .collect();
    diffs.sort_by(f64::total_cmp);

    let count = diffs.len();
    let mean = diffs.iter().sum::<f64>() / count as f64;
    let p95 = diffs[((count as f64 * 0.95) as usize).min(count - 1)];
    Some(GridDiffStats {
        mean,
        max: diffs[count - 1],
        p95,
        count,
    })
}
