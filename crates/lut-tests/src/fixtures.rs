//! Fixture files in the formats the pipeline reads

use std::fmt::Write as _;

use oxlut_core::ColorGrid;
use oxlut_core::grid::{RASTER_ORDER, SOURCE_ORDER, index_of, node_at};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Sample-only rows in source nesting (B outer, R middle, G inner)
pub fn source_rows(grid: &ColorGrid) -> String {
    let n = grid.size();
    let mut out = String::new();
    for row in 0..grid.len() {
        let [r, g, b] = node_at(SOURCE_ORDER, row, n);
        let s = grid.get(r, g, b).expect("node in range");
        let _ = writeln!(out, "{:.10} {:.10} {:.10}", s[0], s[1], s[2]);
    }
    out
}

/// Rows with explicit coordinates, shuffled with `seed`
pub fn explicit_rows(grid: &ColorGrid, seed: u64) -> String {
    let n = grid.size();
    let max = (n - 1) as f64;
    let mut order: Vec<usize> = (0..grid.len()).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let mut out = String::from("# r g b -> r g b\n");
    for index in order {
        let node = node_at(RASTER_ORDER, index, n);
        debug_assert_eq!(index_of(RASTER_ORDER, node, n), index);
        let s = grid.samples()[index];
        let _ = writeln!(
            out,
            "{} {} {} {:.10} {:.10} {:.10}",
            node[0] as f64 / max,
            node[1] as f64 / max,
            node[2] as f64 / max,
            s[0],
            s[1],
            s[2]
        );
    }
    out
}

/// Argyll `.cal` text with identical channels
pub fn cal_text(points: &[(f64, f64)], tv_encoding: bool) -> String {
    let mut out = String::from("CAL\n\nDESCRIPTOR \"Argyll Device Calibration State\"\n");
    out.push_str("KEYWORD \"DEVICE_CLASS\"\nDEVICE_CLASS \"DISPLAY\"\nCOLOR_REP \"RGB\"\n");
    if tv_encoding {
        out.push_str("TV_OUTPUT_ENCODING \"YES\"\n");
    }
    out.push_str("\nNUMBER_OF_FIELDS 4\nBEGIN_DATA_FORMAT\nRGB_I RGB_R RGB_G RGB_B\nEND_DATA_FORMAT\n\n");
    let _ = writeln!(out, "NUMBER_OF_SETS {}", points.len());
    out.push_str("BEGIN_DATA\n");
    for &(i, o) in points {
        let _ = writeln!(out, "{:.10} {:.10} {:.10} {:.10}", i, o, o, o);
    }
    out.push_str("END_DATA\n");
    out
}
