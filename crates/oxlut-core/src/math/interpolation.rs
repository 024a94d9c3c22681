//! Interpolation functions for grid and curve evaluation
//!
//! Grid functions take samples in canonical raster order (R fastest, B
//! slowest) and a position in grid units, `[r, g, b]` with each axis in
//! `[0, size-1]`. Positions outside that range are clamped, never
//! extrapolated.
//!
//! This module provides:
//! - Linear interpolation (1D)
//! - Trilinear interpolation (3D grid)
//! - Tetrahedral interpolation (3D grid)
//! - Nearest grid point lookup

/// Linear interpolation between two values
///
/// Returns a + t * (b - a) for t in [0, 1]
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

#[inline]
fn lerp3(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

/// Lower node, upper node and fractional offset along one axis
#[inline]
fn axis(p: f64, size: usize) -> (usize, usize, f64) {
    let max = (size - 1) as f64;
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, max) };
    let i0 = p.floor() as usize;
    let i1 = (i0 + 1).min(size - 1);
    (i0, i1, p - i0 as f64)
}

#[inline]
fn at(samples: &[[f64; 3]], size: usize, r: usize, g: usize, b: usize) -> [f64; 3] {
    samples[(b * size + g) * size + r]
}

/// Trilinear interpolation of the 8 nodes around `p`
pub fn trilinear(samples: &[[f64; 3]], size: usize, p: [f64; 3]) -> [f64; 3] {
    let (r0, r1, fr) = axis(p[0], size);
    let (g0, g1, fg) = axis(p[1], size);
    let (b0, b1, fb) = axis(p[2], size);

    // Interpolate along r
    let c00 = lerp3(at(samples, size, r0, g0, b0), at(samples, size, r1, g0, b0), fr);
    let c10 = lerp3(at(samples, size, r0, g1, b0), at(samples, size, r1, g1, b0), fr);
    let c01 = lerp3(at(samples, size, r0, g0, b1), at(samples, size, r1, g0, b1), fr);
    let c11 = lerp3(at(samples, size, r0, g1, b1), at(samples, size, r1, g1, b1), fr);

    // Then g, then b
    let c0 = lerp3(c00, c10, fg);
    let c1 = lerp3(c01, c11, fg);
    lerp3(c0, c1, fb)
}

/// Tetrahedral interpolation
///
/// Divides each cube into 6 tetrahedra along the main diagonal and
/// interpolates within the one containing `p`. Neutral inputs only ever
/// touch the diagonal nodes.
pub fn tetrahedral(samples: &[[f64; 3]], size: usize, p: [f64; 3]) -> [f64; 3] {
    let (r0, r1, fr) = axis(p[0], size);
    let (g0, g1, fg) = axis(p[1], size);
    let (b0, b1, fb) = axis(p[2], size);

    let c000 = at(samples, size, r0, g0, b0);
    let c111 = at(samples, size, r1, g1, b1);

    // Walk from c000 to c111 through the two intermediate corners picked
    // by the ordering of the fractions, largest first.
    let (w1, c1, w2, c2, w3) = if fr > fg {
        if fg > fb {
            (fr, at(samples, size, r1, g0, b0), fg, at(samples, size, r1, g1, b0), fb)
        } else if fr > fb {
            (fr, at(samples, size, r1, g0, b0), fb, at(samples, size, r1, g0, b1), fg)
        } else {
            (fb, at(samples, size, r0, g0, b1), fr, at(samples, size, r1, g0, b1), fg)
        }
    } else if fg > fb {
        if fr > fb {
            (fg, at(samples, size, r0, g1, b0), fr, at(samples, size, r1, g1, b0), fb)
        } else {
            (fg, at(samples, size, r0, g1, b0), fb, at(samples, size, r0, g1, b1), fr)
        }
    } else {
        (fb, at(samples, size, r0, g0, b1), fg, at(samples, size, r0, g1, b1), fr)
    };

    let mut out = [0.0; 3];
    for c in 0..3 {
        out[c] = c000[c]
            + w1 * (c1[c] - c000[c])
            + w2 * (c2[c] - c1[c])
            + w3 * (c111[c] - c2[c]);
    }
    out
}

/// Value of the node closest to `p`; exact halves round up
pub fn nearest(samples: &[[f64; 3]], size: usize, p: [f64; 3]) -> [f64; 3] {
    let max = (size - 1) as f64;
    let node = |v: f64| {
        let v = if v.is_nan() { 0.0 } else { v };
        (v + 0.5).floor().clamp(0.0, max) as usize
    };
    at(samples, size, node(p[0]), node(p[1]), node(p[2]))
}

/// Lookup in a uniformly sampled 1D table over [0, 1] with linear interpolation
pub fn lut1d_interp(lut: &[f64], input: f64) -> f64 {
    if lut.is_empty() {
        return input;
    }
    if lut.len() == 1 {
        return lut[0];
    }

    let (i0, i1, t) = axis(input * (lut.len() - 1) as f64, lut.len());
    lerp(lut[i0], lut[i1], t)
}
