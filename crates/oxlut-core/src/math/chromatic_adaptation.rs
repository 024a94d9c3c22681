//! Chromatic Adaptation
//!
//! Bradford adaptation between white points, as used by ICC.1:2022 Annex E.
//!
//! References:
//! - Lindbloom: http://www.brucelindbloom.com/index.html?Eqn_ChromAdapt.html

use crate::math::Matrix3x3;

/// Bradford matrix: XYZ → LMS (cone response)
const BRADFORD_XYZ_TO_LMS: Matrix3x3 = Matrix3x3::new([
    [0.8951000, 0.2664000, -0.1614000],
    [-0.7502000, 1.7135000, 0.0367000],
    [0.0389000, -0.0685000, 1.0296000],
]);

/// Bradford matrix: LMS → XYZ (inverse)
const BRADFORD_LMS_TO_XYZ: Matrix3x3 = Matrix3x3::new([
    [0.9869929, -0.1470543, 0.1599627],
    [0.4323053, 0.5183603, 0.0492912],
    [-0.0085287, 0.0400428, 0.9684867],
]);

/// XYZ with Y = 1 for a CIE xy chromaticity
pub fn xy_to_xyz(xy: [f64; 2]) -> [f64; 3] {
    let [x, y] = xy;
    [x / y, 1.0, (1.0 - x - y) / y]
}

/// Bradford matrix taking XYZ under `src_white` to XYZ under `dst_white`
///
/// Both white points are XYZ with Y = 1. `XYZ_dst = M × XYZ_src`.
pub fn bradford_matrix(src_white: [f64; 3], dst_white: [f64; 3]) -> Matrix3x3 {
    let src_lms = BRADFORD_XYZ_TO_LMS.multiply_vec(src_white);
    let dst_lms = BRADFORD_XYZ_TO_LMS.multiply_vec(dst_white);

    let ratio = |i: usize| {
        if src_lms[i].abs() > 1e-10 {
            dst_lms[i] / src_lms[i]
        } else {
            1.0
        }
    };
    let scale = Matrix3x3::diagonal(ratio(0), ratio(1), ratio(2));

    // M = M_A^-1 × Scale × M_A
    BRADFORD_LMS_TO_XYZ.multiply(&scale.multiply(&BRADFORD_XYZ_TO_LMS))
}
