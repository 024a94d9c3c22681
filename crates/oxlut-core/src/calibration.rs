//! Per-channel calibration curves
//!
//! A [`CalibrationCurve`] holds ordered (input, output) points for R, G and
//! B. [`CalibrationAppender`] folds it into the input or output curves of a
//! [`Lut3d`].
//!
//! Curves load from Argyll `.cal` files (CGATS with fields
//! `RGB_I RGB_R RGB_G RGB_B`) or from plain 4-column text (`in r g b`).

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::curve::Curve1d;
use crate::error::{Error, Result};
use crate::icc::tags::MAX_TABLE_ENTRIES;
use crate::lut3d::Lut3d;

const CHANNELS: [&str; 3] = ["R", "G", "B"];
const CAL_FIELDS: [&str; 4] = ["RGB_I", "RGB_R", "RGB_G", "RGB_B"];

/// Monotonic (input, output) points per channel
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationCurve {
    channels: [Vec<(f64, f64)>; 3],
}

impl CalibrationCurve {
    /// The two-point identity
    pub fn linear() -> Self {
        let line = vec![(0.0, 0.0), (1.0, 1.0)];
        Self {
            channels: [line.clone(), line.clone(), line],
        }
    }

    /// Curve from per-channel points
    ///
    /// Inputs and outputs must both be non-decreasing and finite.
    pub fn from_points(channels: [Vec<(f64, f64)>; 3]) -> Result<Self> {
        for (name, points) in CHANNELS.iter().zip(&channels) {
            validate_channel(name, points)?;
        }
        Ok(Self { channels })
    }

    /// Curve from shared inputs and one RGB output per input
    pub fn from_rows(rows: &[(f64, [f64; 3])]) -> Result<Self> {
        let channel = |c: usize| rows.iter().map(|&(i, o)| (i, o[c])).collect::<Vec<_>>();
        Self::from_points([channel(0), channel(1), channel(2)])
    }

    pub fn channel(&self, index: usize) -> &[(f64, f64)] {
        &self.channels[index]
    }

    /// True when every channel maps [0, 1] onto itself
    ///
    /// Points must lie on the diagonal and cover both ends; past the last
    /// point a channel extends flat.
    pub fn is_linear(&self, epsilon: f64) -> bool {
        self.channels.iter().all(|points| {
            let spans = match (points.first(), points.last()) {
                (Some(&(first, _)), Some(&(last, _))) => first <= epsilon && last >= 1.0 - epsilon,
                _ => false,
            };
            spans && points.iter().all(|&(i, o)| (i - o).abs() <= epsilon)
        })
    }

    /// Largest point count of any channel
    pub fn points(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Uniformly resampled tables with `entries` points each
    pub fn to_curves(&self, entries: usize) -> Result<[Curve1d; 3]> {
        let curve = |points: &[(f64, f64)]| Curve1d::sampled(entries, |x| piecewise(points, x));
        Ok([
            curve(&self.channels[0])?,
            curve(&self.channels[1])?,
            curve(&self.channels[2])?,
        ])
    }

    /// Parse `.cal` CGATS or plain 4-column rows
    pub fn parse_str(text: &str) -> Result<Self> {
        let is_cgats = text
            .lines()
            .map(str::trim)
            .any(|line| line == "BEGIN_DATA_FORMAT");
        if is_cgats {
            parse_cal(text)
        } else {
            parse_rows(text)
        }
    }

    pub fn read_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let curve = Self::parse_str(&text)?;
        debug!(path = %path.display(), points = curve.points(), "loaded calibration");
        Ok(curve)
    }
}

fn validate_channel(name: &str, points: &[(f64, f64)]) -> Result<()> {
    if points.len() < 2 {
        return Err(Error::Validation(format!(
            "calibration channel {} needs at least 2 points, got {}",
            name,
            points.len()
        )));
    }
    for (n, &(i, o)) in points.iter().enumerate() {
        if !i.is_finite() || !o.is_finite() {
            return Err(Error::Validation(format!(
                "calibration channel {} point {} is not finite",
                name, n
            )));
        }
    }
    for (n, w) in points.windows(2).enumerate() {
        let ((i0, o0), (i1, o1)) = (w[0], w[1]);
        if i1 < i0 {
            return Err(Error::Validation(format!(
                "calibration channel {} input decreases at point {} ({} -> {})",
                name,
                n + 1,
                i0,
                i1
            )));
        }
        if o1 < o0 {
            return Err(Error::Validation(format!(
                "calibration channel {} output decreases at point {} ({} -> {})",
                name,
                n + 1,
                o0,
                o1
            )));
        }
    }
    Ok(())
}

/// Linear interpolation over sorted points; ends extend flat
fn piecewise(points: &[(f64, f64)], x: f64) -> f64 {
    let upper = points.partition_point(|&(i, _)| i <= x);
    if upper == 0 {
        return points[0].1;
    }
    if upper == points.len() {
        return points[points.len() - 1].1;
    }
    let (i0, o0) = points[upper - 1];
    let (i1, o1) = points[upper];
    o0 + (x - i0) / (i1 - i0) * (o1 - o0)
}

fn number(tok: &str, line: usize) -> Result<f64> {
    tok.parse()
        .map_err(|_| Error::Format(format!("line {}: '{}' is not a number", line, tok)))
}

/// Plain `in r g b` rows, `#` comments
fn parse_rows(text: &str) -> Result<CalibrationCurve> {
    let mut rows = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() != 4 {
            return Err(Error::Format(format!(
                "line {}: expected 4 columns, found {}",
                n + 1,
                cols.len()
            )));
        }
        rows.push((
            number(cols[0], n + 1)?,
            [
                number(cols[1], n + 1)?,
                number(cols[2], n + 1)?,
                number(cols[3], n + 1)?,
            ],
        ));
    }
    CalibrationCurve::from_rows(&rows)
}

/// Keyword value with surrounding quotes removed
fn keyword_value(line: &str, keyword: &str) -> Option<String> {
    let rest = line.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().trim_matches('"').to_string())
}

/// Argyll `.cal` (CGATS)
fn parse_cal(text: &str) -> Result<CalibrationCurve> {
    let mut fields: Option<Vec<String>> = None;
    let mut levels: Option<(f64, f64)> = None;
    let mut rows = Vec::new();

    let mut lines = text.lines().enumerate().map(|(n, l)| (n + 1, l.trim()));
    while let Some((line_no, line)) = lines.next() {
        if let Some(v) = keyword_value(line, "TV_OUTPUT_ENCODING") {
            if v.eq_ignore_ascii_case("YES") {
                levels = Some((16.0, 235.0));
            }
        } else if let Some(v) = keyword_value(line, "OUTPUT_ENCODING") {
            let parts: Vec<&str> = v.split_whitespace().collect();
            if let [black, white] = parts.as_slice() {
                levels = Some((number(black, line_no)?, number(white, line_no)?));
            }
        } else if line == "BEGIN_DATA_FORMAT" {
            let mut names = Vec::new();
            for (_, l) in lines.by_ref() {
                if l == "END_DATA_FORMAT" {
                    break;
                }
                names.extend(l.split_whitespace().map(str::to_string));
            }
            fields = Some(names);
        } else if line == "BEGIN_DATA" {
            let names = fields.as_ref().ok_or_else(|| {
                Error::Format(format!("line {}: data before data format", line_no))
            })?;
            if names.len() != CAL_FIELDS.len() || names.iter().zip(CAL_FIELDS).any(|(a, b)| a != b)
            {
                return Err(Error::Validation(format!(
                    "calibration fields must be {}, found {}",
                    CAL_FIELDS.join(" "),
                    names.join(" ")
                )));
            }
            for (n, l) in lines.by_ref() {
                if l == "END_DATA" {
                    break;
                }
                if l.is_empty() {
                    continue;
                }
                let cols: Vec<&str> = l.split_whitespace().collect();
                if cols.len() != 4 {
                    return Err(Error::Format(format!(
                        "line {}: expected 4 values, found {}",
                        n,
                        cols.len()
                    )));
                }
                rows.push((
                    number(cols[0], n)?,
                    [number(cols[1], n)?, number(cols[2], n)?, number(cols[3], n)?],
                ));
            }
        }
    }

    if fields.is_none() {
        return Err(Error::Validation(
            "calibration file has no data format".to_string(),
        ));
    }
    if let Some((black, white)) = levels {
        if white <= black {
            return Err(Error::Format(format!(
                "output encoding {} {} is not increasing",
                black, white
            )));
        }
        unscale_levels(&mut rows, black, white);
    }
    CalibrationCurve::from_rows(&rows)
}

/// 16-bit values of 8-bit codes widened by shifting span `code / 256` of
/// the range, rescaled by this factor
const SHIFT_SCALE: f64 = 65536.0 / 65535.0;

fn round_hundredths(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Map outputs encoded in `black..=white` (8-bit codes) back to [0, 1]
///
/// Data reaching outside the encoded range cannot be encoded that way and
/// is kept as-is.
fn unscale_levels(rows: &mut [(f64, [f64; 3])], black: f64, white: f64) {
    if black == 0.0 && white == 255.0 {
        return;
    }
    let (lo, hi) = (round_hundredths(black), round_hundredths(white));
    let outside = rows
        .iter()
        .flat_map(|(_, rgb)| rgb)
        .map(|&v| round_hundredths(v / SHIFT_SCALE * 256.0))
        .find(|&code| code < lo || code > hi);
    if let Some(code) = outside {
        warn!(
            black,
            white,
            code,
            "calibration exceeds its declared output encoding, using values as-is"
        );
        return;
    }

    debug!(black, white, "unscaling calibration from encoded levels");
    let min = black / 256.0 * SHIFT_SCALE;
    let max = white / 256.0 * SHIFT_SCALE;
    for (_, rgb) in rows {
        *rgb = rgb.map(|v| ((v - min) / (max - min)).clamp(0.0, 1.0));
    }
}

/// Where the calibration sits relative to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPoint {
    /// Grid, then calibration
    #[default]
    Output,
    /// Calibration, then grid
    Input,
}

impl fmt::Display for InsertionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InsertionPoint::Output => "output",
            InsertionPoint::Input => "input",
        })
    }
}

impl FromStr for InsertionPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "output" => Ok(InsertionPoint::Output),
            "input" => Ok(InsertionPoint::Input),
            _ => Err(Error::Config(format!(
                "unknown calibration insertion point '{}'",
                s
            ))),
        }
    }
}

/// Composes a calibration curve into a [`Lut3d`]
#[derive(Debug, Clone, Default)]
pub struct CalibrationAppender {
    curve: Option<CalibrationCurve>,
    at: InsertionPoint,
}

impl CalibrationAppender {
    /// No calibration: `append` returns its input
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curve(mut self, curve: CalibrationCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn with_insertion_point(mut self, at: InsertionPoint) -> Self {
        self.at = at;
        self
    }

    pub fn curve(&self) -> Option<&CalibrationCurve> {
        self.curve.as_ref()
    }

    /// New LUT with the calibration folded into its curves
    pub fn append(&self, lut: &Lut3d) -> Result<Lut3d> {
        let curve = match &self.curve {
            Some(c) if !c.is_linear(0.0) => c,
            _ => {
                debug!("no calibration to append");
                return Ok(lut.clone());
            }
        };

        let existing = match self.at {
            InsertionPoint::Output => &lut.output_curves,
            InsertionPoint::Input => &lut.input_curves,
        };
        let entries = existing
            .iter()
            .map(Curve1d::len)
            .chain([curve.points()])
            .max()
            .unwrap_or(2)
            .clamp(2, MAX_TABLE_ENTRIES);
        let cal = curve.to_curves(entries)?;

        let mut out = lut.clone();
        match self.at {
            InsertionPoint::Output => {
                for c in 0..3 {
                    out.output_curves[c] = cal[c].compose(&lut.output_curves[c], entries);
                }
            }
            InsertionPoint::Input => {
                for c in 0..3 {
                    out.input_curves[c] = lut.input_curves[c].compose(&cal[c], entries);
                }
            }
        }
        info!(at = %self.at, entries, "appended calibration");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::grid::ColorGrid;

    const EPSILON: f64 = 1e-9;

    fn gamma(points: usize, g: f64) -> CalibrationCurve {
        let rows: Vec<_> = (0..points)
            .map(|i| {
                let x = i as f64 / (points - 1) as f64;
                (x, [x.powf(g); 3])
            })
            .collect();
        CalibrationCurve::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_rejects_decreasing_output() {
        let rows = [
            (0.0, [0.0, 0.0, 0.0]),
            (0.5, [0.5, 0.6, 0.5]),
            (1.0, [1.0, 0.4, 1.0]),
        ];
        let err = CalibrationCurve::from_rows(&rows).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("channel G"));
    }

    #[test]
    fn test_rejects_decreasing_input() {
        let points = vec![(0.0, 0.0), (0.6, 0.5), (0.4, 1.0)];
        let line = vec![(0.0, 0.0), (1.0, 1.0)];
        let err = CalibrationCurve::from_points([points, line.clone(), line]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_piecewise_ends_flat() {
        let points = [(0.2, 0.1), (0.8, 0.9)];
        assert_eq!(piecewise(&points, 0.0), 0.1);
        assert_eq!(piecewise(&points, 1.0), 0.9);
        assert!((piecewise(&points, 0.5) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_linear_is_noop() {
        let lut = Lut3d::from_grid(ColorGrid::from_fn(3, |[r, g, b]| [g, b, r]).unwrap());
        let out = CalibrationAppender::new()
            .with_curve(CalibrationCurve::linear())
            .append(&lut)
            .unwrap();
        assert_eq!(out, lut);
        assert_eq!(CalibrationAppender::new().append(&lut).unwrap(), lut);
    }

    #[test]
    fn test_partial_diagonal_is_applied() {
        let inner = CalibrationCurve::from_rows(&[(0.2, [0.2; 3]), (0.8, [0.8; 3])]).unwrap();
        assert!(!inner.is_linear(0.0));

        let lut = Lut3d::from_grid(ColorGrid::identity(5).unwrap());
        let out = CalibrationAppender::new().with_curve(inner).append(&lut).unwrap();
        assert_ne!(out, lut);
        let dark = out.eval([0.0; 3]);
        let bright = out.eval([1.0; 3]);
        assert!((dark[0] - 0.2).abs() < 1e-9);
        assert!((bright[0] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_output_insertion() {
        let lut = Lut3d::from_grid(ColorGrid::identity(5).unwrap());
        let out = CalibrationAppender::new()
            .with_curve(gamma(256, 2.0))
            .append(&lut)
            .unwrap();
        assert_eq!(out.grid, lut.grid);
        assert!(out.input_curves.iter().all(|c| c.is_identity(0.0)));
        let v = out.eval([0.5, 0.5, 0.5]);
        assert!((v[0] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_input_insertion_order() {
        // Grid squares, calibration halves: input gives (x/2)², output gives x²/2
        let lut = Lut3d::from_grid(ColorGrid::from_fn(33, |c| c.map(|v| v * v)).unwrap());
        let half = CalibrationCurve::from_rows(&[(0.0, [0.0; 3]), (1.0, [0.5; 3])]).unwrap();

        let input = CalibrationAppender::new()
            .with_curve(half.clone())
            .with_insertion_point(InsertionPoint::Input)
            .append(&lut)
            .unwrap();
        let output = CalibrationAppender::new()
            .with_curve(half)
            .append(&lut)
            .unwrap();

        let x = 0.8;
        assert!((input.eval([x; 3])[0] - 0.16).abs() < 1e-3);
        assert!((output.eval([x; 3])[0] - 0.32).abs() < 1e-3);
    }

    #[test]
    fn test_parse_cal() {
        let text = "CAL\n\nDESCRIPTOR \"Argyll Device Calibration State\"\n\
                    KEYWORD \"DEVICE_CLASS\"\nDEVICE_CLASS \"DISPLAY\"\n\
                    COLOR_REP \"RGB\"\n\nNUMBER_OF_FIELDS 4\nBEGIN_DATA_FORMAT\n\
                    RGB_I RGB_R RGB_G RGB_B\nEND_DATA_FORMAT\n\n\
                    NUMBER_OF_SETS 3\nBEGIN_DATA\n0.0 0.0 0.0 0.0\n\
                    0.5 0.4 0.45 0.5\n1.0 1.0 0.9 1.0\nEND_DATA\n";
        let cal = CalibrationCurve::parse_str(text).unwrap();
        assert_eq!(cal.points(), 3);
        assert_eq!(cal.channel(1), &[(0.0, 0.0), (0.5, 0.45), (1.0, 0.9)]);
    }

    /// `.cal` value of an 8-bit code widened to 16 bits by shifting
    fn shifted(code: f64) -> f64 {
        code / 256.0 * SHIFT_SCALE
    }

    fn tv_cal(values: &[(f64, f64)]) -> String {
        let mut text = String::from(
            "CAL\nTV_OUTPUT_ENCODING \"YES\"\nBEGIN_DATA_FORMAT\n\
             RGB_I RGB_R RGB_G RGB_B\nEND_DATA_FORMAT\nBEGIN_DATA\n",
        );
        for (i, o) in values {
            text.push_str(&format!("{} {} {} {}\n", i, o, o, o));
        }
        text.push_str("END_DATA\n");
        text
    }

    #[test]
    fn test_parse_cal_video_levels() {
        let text = tv_cal(&[(0.0, shifted(16.0)), (0.5, shifted(125.5)), (1.0, shifted(235.0))]);
        let cal = CalibrationCurve::parse_str(&text).unwrap();
        for c in 0..3 {
            let ch = cal.channel(c);
            assert!(ch[0].1.abs() < EPSILON);
            assert!((ch[1].1 - 0.5).abs() < EPSILON);
            assert!((ch[2].1 - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_video_levels_clamp_to_unit_range() {
        // 15.996 rounds to code 16.00, so it is in range but below black
        let text = tv_cal(&[(0.0, shifted(15.996)), (1.0, shifted(235.004))]);
        let cal = CalibrationCurve::parse_str(&text).unwrap();
        assert_eq!(cal.channel(0), &[(0.0, 0.0), (1.0, 1.0)]);
    }

    #[test]
    fn test_video_levels_outside_encoding_kept() {
        // Full-range black under a video-level header
        let values = [(0.0, 0.0), (0.5, 0.5), (1.0, shifted(235.0))];
        let cal = CalibrationCurve::parse_str(&tv_cal(&values)).unwrap();
        for c in 0..3 {
            let ch = cal.channel(c);
            assert_eq!(ch[0].1, 0.0);
            assert_eq!(ch[1].1, 0.5);
            assert!(ch.iter().all(|&(_, o)| (0.0..=1.0).contains(&o)));
        }
    }

    #[test]
    fn test_full_range_encoding_unchanged() {
        let text = "CAL\nOUTPUT_ENCODING \"0 255\"\nBEGIN_DATA_FORMAT\n\
                    RGB_I RGB_R RGB_G RGB_B\nEND_DATA_FORMAT\nBEGIN_DATA\n\
                    0 0.1 0.1 0.1\n1 0.9 0.9 0.9\nEND_DATA\n";
        let cal = CalibrationCurve::parse_str(text).unwrap();
        assert_eq!(cal.channel(2), &[(0.0, 0.1), (1.0, 0.9)]);
    }

    #[test]
    fn test_parse_cal_wrong_fields() {
        let text = "CAL\nBEGIN_DATA_FORMAT\nRGB_I RGB_R RGB_G\nEND_DATA_FORMAT\n\
                    BEGIN_DATA\n0 0 0\nEND_DATA\n";
        let err = CalibrationCurve::parse_str(text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_parse_plain_rows() {
        let cal = CalibrationCurve::parse_str("# in r g b\n0 0 0 0\n1 1 1 1\n").unwrap();
        assert!(cal.is_linear(0.0));
        let err = CalibrationCurve::parse_str("0 0 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
