//! LUT file formats
//!
//! - `.cube`: text, `LUT_3D_SIZE` then one `r g b` row per node, R fastest.
//! - `3DLT`: binary 16-bit container.
//!
//! `3DLT` layout, all big-endian:
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 4    | magic `3DLT`                           |
//! | 4      | 2    | version (1)                            |
//! | 6      | 2    | header length (16)                     |
//! | 8      | 2    | grid size N                            |
//! | 10     | 1    | channels (3)                           |
//! | 11     | 1    | bit depth (16)                         |
//! | 12     | 1    | raster order (0: B-G-R nesting)        |
//! | 13     | 1    | flags (bit 0: HDR)                     |
//! | 14     | 2    | reserved, zero                         |
//! | 16     | …    | N³ × 3 u16 samples, round(v × 65535)   |

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::quantize_u16;
use crate::error::{Error, Result};
use crate::grid::ColorGrid;

/// Output/input formats recognized by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LutFormat {
    /// `.cube`
    Cube,
    /// `.3dlut`, `.bin`
    Binary,
    /// `.icc`, `.icm` device link
    Icc,
}

impl LutFormat {
    /// Format for a path's extension, case-insensitive
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cube" => Some(LutFormat::Cube),
            "3dlut" | "bin" => Some(LutFormat::Binary),
            "icc" | "icm" => Some(LutFormat::Icc),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            LutFormat::Cube => "cube",
            LutFormat::Binary => "3dlut",
            LutFormat::Icc => "icc",
        }
    }
}

/// Serialize a grid as `.cube` text
pub fn encode_cube(grid: &ColorGrid, title: Option<&str>) -> String {
    let mut out = String::with_capacity(grid.len() * 30 + 128);
    if let Some(title) = title {
        // Quotes would end the title early
        let _ = writeln!(out, "TITLE \"{}\"", title.replace('"', "'"));
    }
    let _ = writeln!(out, "LUT_3D_SIZE {}", grid.size());
    out.push_str("DOMAIN_MIN 0.0 0.0 0.0\n");
    out.push_str("DOMAIN_MAX 1.0 1.0 1.0\n");
    for s in grid.samples() {
        let _ = writeln!(out, "{:.7} {:.7} {:.7}", s[0], s[1], s[2]);
    }
    out
}

/// Parsed `.cube` contents
#[derive(Debug, Clone, PartialEq)]
pub struct CubeFile {
    pub title: Option<String>,
    pub grid: ColorGrid,
}

fn cube_domain(values: &[&str], expected: f64, line: usize) -> Result<()> {
    let parsed = values
        .iter()
        .map(|v| v.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::Format(format!("line {}: malformed domain", line)))?;
    if parsed.len() != 3 || parsed.iter().any(|&v| v != expected) {
        return Err(Error::Format(format!(
            "line {}: only a [0, 1] domain is supported",
            line
        )));
    }
    Ok(())
}

/// Parse `.cube` text
pub fn decode_cube(text: &str) -> Result<CubeFile> {
    let mut title = None;
    let mut size: Option<usize> = None;
    let mut samples = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let line_no = n + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else { continue };
        let rest: Vec<&str> = parts.collect();
        match head {
            "TITLE" => {
                let raw = line["TITLE".len()..].trim();
                title = Some(raw.trim_matches('"').to_string());
            }
            "LUT_3D_SIZE" => {
                let value = rest
                    .first()
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or_else(|| {
                        Error::Format(format!("line {}: malformed LUT_3D_SIZE", line_no))
                    })?;
                size = Some(value);
            }
            "LUT_1D_SIZE" => {
                return Err(Error::Format(format!(
                    "line {}: 1D cube files are not supported",
                    line_no
                )));
            }
            "DOMAIN_MIN" => cube_domain(&rest, 0.0, line_no)?,
            "DOMAIN_MAX" => cube_domain(&rest, 1.0, line_no)?,
            _ if head.starts_with(|c: char| c.is_ascii_alphabetic()) => {
                debug!(line = line_no, keyword = head, "skipping cube keyword");
            }
            _ => {
                let values = line
                    .split_whitespace()
                    .map(|tok| {
                        tok.parse::<f64>().map_err(|_| {
                            Error::Format(format!("line {}: '{}' is not a number", line_no, tok))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?;
                if values.len() != 3 {
                    return Err(Error::Format(format!(
                        "line {}: expected 3 values, found {}",
                        line_no,
                        values.len()
                    )));
                }
                samples.push([values[0], values[1], values[2]]);
            }
        }
    }

    let size =
        size.ok_or_else(|| Error::Format("cube file has no LUT_3D_SIZE".to_string()))?;
    let grid = ColorGrid::new(size, samples)?;
    Ok(CubeFile { title, grid })
}

const MAGIC: [u8; 4] = *b"3DLT";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 16;
const CHANNELS: u8 = 3;
const BIT_DEPTH: u8 = 16;
const ORDER_BGR: u8 = 0;
const FLAG_HDR: u8 = 0x01;

/// Grid in the `3DLT` container
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryLut {
    pub grid: ColorGrid,
    /// Samples are HDR (BT.2020) encoded
    pub hdr: bool,
}

impl BinaryLut {
    pub fn new(grid: ColorGrid) -> Self {
        Self { grid, hdr: false }
    }

    pub fn with_hdr(mut self, hdr: bool) -> Self {
        self.hdr = hdr;
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let size = u16::try_from(self.grid.size()).map_err(|_| {
            Error::Dimension(format!(
                "grid resolution {} does not fit the binary container",
                self.grid.size()
            ))
        })?;
        let flat = self.grid.as_flat();
        let mut out = Vec::with_capacity(HEADER_LEN + flat.len() * 2);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&(HEADER_LEN as u16).to_be_bytes());
        out.extend_from_slice(&size.to_be_bytes());
        out.push(CHANNELS);
        out.push(BIT_DEPTH);
        out.push(ORDER_BGR);
        out.push(if self.hdr { FLAG_HDR } else { 0 });
        out.extend_from_slice(&[0, 0]);
        for &v in flat {
            out.extend_from_slice(&quantize_u16(v).to_be_bytes());
        }
        Ok(out)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Format(format!(
                "binary LUT is {} bytes, shorter than its header",
                data.len()
            )));
        }
        if data[0..4] != MAGIC {
            return Err(Error::Format("binary LUT magic is not 3DLT".to_string()));
        }
        let u16_at = |at: usize| u16::from_be_bytes([data[at], data[at + 1]]);

        let version = u16_at(4);
        if version != VERSION {
            return Err(Error::Format(format!(
                "unsupported binary LUT version {}",
                version
            )));
        }
        let header_len = u16_at(6) as usize;
        if header_len != HEADER_LEN {
            return Err(Error::Format(format!(
                "binary LUT header length {} (expected {})",
                header_len, HEADER_LEN
            )));
        }
        let size = u16_at(8) as usize;
        if data[10] != CHANNELS {
            return Err(Error::Format(format!(
                "binary LUT has {} channels (expected {})",
                data[10], CHANNELS
            )));
        }
        if data[11] != BIT_DEPTH {
            return Err(Error::Format(format!(
                "binary LUT bit depth {} (expected {})",
                data[11], BIT_DEPTH
            )));
        }
        if data[12] != ORDER_BGR {
            return Err(Error::Format(format!(
                "unknown binary LUT raster order {}",
                data[12]
            )));
        }
        let hdr = data[13] & FLAG_HDR != 0;

        let payload = &data[HEADER_LEN..];
        let expected = size * size * size * 3 * 2;
        if payload.len() != expected {
            return Err(Error::Format(format!(
                "binary LUT payload is {} bytes, {}^3 grid needs {}",
                payload.len(),
                size,
                expected
            )));
        }
        let samples = payload
            .chunks_exact(6)
            .map(|c| {
                [0, 2, 4].map(|i| u16::from_be_bytes([c[i], c[i + 1]]) as f64 / 65535.0)
            })
            .collect();
        Ok(Self {
            grid: ColorGrid::new(size, samples)?,
            hdr,
        })
    }
}
