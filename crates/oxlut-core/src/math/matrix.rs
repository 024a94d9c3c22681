//! 3x3 matrix operations for primaries conversion
//!
//! Grid samples are treated as column vectors: `out = M × sample`.

use std::ops::Mul;

/// A 3x3 matrix, row-major: m[row][col]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3x3 {
    pub m: [[f64; 3]; 3],
}

impl Matrix3x3 {
    #[inline]
    pub const fn new(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self::diagonal(1.0, 1.0, 1.0)
    }

    #[inline]
    pub const fn diagonal(d0: f64, d1: f64, d2: f64) -> Self {
        Self {
            m: [[d0, 0.0, 0.0], [0.0, d1, 0.0], [0.0, 0.0, d2]],
        }
    }

    /// Build from three column vectors
    pub const fn from_columns(c0: [f64; 3], c1: [f64; 3], c2: [f64; 3]) -> Self {
        Self {
            m: [
                [c0[0], c1[0], c2[0]],
                [c0[1], c1[1], c2[1]],
                [c0[2], c1[2], c2[2]],
            ],
        }
    }

    /// Returns M × v
    #[inline]
    pub fn multiply_vec(&self, v: [f64; 3]) -> [f64; 3] {
        self.m.map(|row| dot(row, v))
    }

    /// Returns self × other
    pub fn multiply(&self, other: &Self) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Self { m }
    }

    pub fn determinant(&self) -> f64 {
        let [r0, r1, r2] = self.m;
        dot(r0, cross(r1, r2))
    }

    /// Inverse from row cross products; None if the matrix is singular
    pub fn inverse(&self) -> Option<Self> {
        let [r0, r1, r2] = self.m;
        let c0 = cross(r1, r2);
        let det = dot(r0, c0);
        if det.abs() < 1e-14 {
            return None;
        }
        let scale = |v: [f64; 3]| v.map(|x| x / det);
        Some(Self::from_columns(
            scale(c0),
            scale(cross(r2, r0)),
            scale(cross(r0, r1)),
        ))
    }

    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.approx_eq(&Self::identity(), epsilon)
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

impl Default for Matrix3x3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Matrix3x3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.multiply(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_identity() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(Matrix3x3::identity().multiply_vec(v), v);
    }

    #[test]
    fn test_from_columns() {
        let m = Matrix3x3::from_columns([1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]);
        assert_eq!(m.multiply_vec([1.0, 0.0, 0.0]), [1.0, 2.0, 3.0]);
        assert_eq!(m.multiply_vec([0.0, 0.0, 1.0]), [7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_inverse() {
        let a = Matrix3x3::new([[1.0, 2.0, 3.0], [0.0, 1.0, 4.0], [5.0, 6.0, 0.0]]);
        assert!((a.determinant() - 1.0).abs() < EPSILON);

        let product = a * a.inverse().unwrap();
        assert!(product.is_identity(1e-9));
    }

    #[test]
    fn test_singular_matrix() {
        let singular = Matrix3x3::new([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [5.0, 7.0, 9.0]]);
        assert!(singular.inverse().is_none());
    }
}
