//! LUT Tag Type (mft2 / lut16Type)
//!
//! Layout after the 8-byte type header:
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 1    | input channels                |
//! | 1      | 1    | output channels               |
//! | 2      | 1    | CLUT grid points              |
//! | 3      | 1    | reserved                      |
//! | 4      | 36   | 3x3 matrix, s15Fixed16        |
//! | 40     | 2    | input table entries           |
//! | 42     | 2    | output table entries          |
//! | 44     | ...  | input tables, CLUT, output tables (u16) |
//!
//! See ICC.1:2022 Section 10.11

use crate::icc::error::IccError;
use crate::icc::types::{S15Fixed16, TypeSignature};

/// Smallest legal 1D table
pub const MIN_TABLE_ENTRIES: usize = 2;
/// Largest legal 1D table
pub const MAX_TABLE_ENTRIES: usize = 4096;

const FIXED_LEN: usize = 44;

/// 16-bit LUT data (mft2 / Lut16Type)
#[derive(Debug, Clone, PartialEq)]
pub struct Lut16Data {
    /// Number of input channels
    pub input_channels: u8,
    /// Number of output channels
    pub output_channels: u8,
    /// Number of CLUT grid points
    pub grid_points: u8,
    /// 3x3 matrix (stored row-major)
    pub matrix: [[S15Fixed16; 3]; 3],
    /// Input curves (one per input channel, equal length)
    pub input_curves: Vec<Vec<u16>>,
    /// CLUT data, gridPoints^inputChannels * outputChannels values
    pub clut: Vec<u16>,
    /// Output curves (one per output channel, equal length)
    pub output_curves: Vec<Vec<u16>>,
}

/// Identity s15Fixed16 matrix
pub const IDENTITY_MATRIX: [[S15Fixed16; 3]; 3] = [
    [S15Fixed16::ONE, S15Fixed16::ZERO, S15Fixed16::ZERO],
    [S15Fixed16::ZERO, S15Fixed16::ONE, S15Fixed16::ZERO],
    [S15Fixed16::ZERO, S15Fixed16::ZERO, S15Fixed16::ONE],
];

fn clut_entries(grid_points: u8, input_channels: u8, output_channels: u8) -> Option<usize> {
    (grid_points as usize)
        .checked_pow(input_channels as u32)?
        .checked_mul(output_channels as usize)
}

fn read_u16s(data: &[u8], start: usize, count: usize) -> Vec<u16> {
    data[start..start + count * 2]
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect()
}

impl Lut16Data {
    /// Parse Lut16 data from bytes (after type signature and reserved bytes)
    pub fn parse(data: &[u8]) -> Result<Self, IccError> {
        if data.len() < FIXED_LEN {
            return Err(IccError::CorruptedData("Lut16 tag too small".to_string()));
        }

        let input_channels = data[0];
        let output_channels = data[1];
        let grid_points = data[2];

        let mut matrix = [[S15Fixed16::default(); 3]; 3];
        for (row, values) in matrix.iter_mut().enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                let offset = 4 + (row * 3 + col) * 4;
                *value = S15Fixed16::from_be_bytes([
                    data[offset],
                    data[offset + 1],
                    data[offset + 2],
                    data[offset + 3],
                ]);
            }
        }

        let input_entries = u16::from_be_bytes([data[40], data[41]]) as usize;
        let output_entries = u16::from_be_bytes([data[42], data[43]]) as usize;

        for (name, entries) in [("input", input_entries), ("output", output_entries)] {
            if !(MIN_TABLE_ENTRIES..=MAX_TABLE_ENTRIES).contains(&entries) {
                return Err(IccError::CorruptedData(format!(
                    "Lut16 {} table has {} entries",
                    name, entries
                )));
            }
        }

        let clut_len = clut_entries(grid_points, input_channels, output_channels)
            .ok_or_else(|| IccError::CorruptedData("Lut16 CLUT size overflows".to_string()))?;

        let input_len = input_channels as usize * input_entries;
        let output_len = output_channels as usize * output_entries;
        let required = FIXED_LEN + (input_len + clut_len + output_len) * 2;
        if data.len() < required {
            return Err(IccError::CorruptedData(format!(
                "Lut16 truncated: need {} bytes, have {}",
                required,
                data.len()
            )));
        }

        let input_curves = (0..input_channels as usize)
            .map(|i| read_u16s(data, FIXED_LEN + i * input_entries * 2, input_entries))
            .collect();

        let clut_offset = FIXED_LEN + input_len * 2;
        let clut = read_u16s(data, clut_offset, clut_len);

        let output_offset = clut_offset + clut_len * 2;
        let output_curves = (0..output_channels as usize)
            .map(|i| read_u16s(data, output_offset + i * output_entries * 2, output_entries))
            .collect();

        Ok(Self {
            input_channels,
            output_channels,
            grid_points,
            matrix,
            input_curves,
            clut,
            output_curves,
        })
    }

    /// Entries per input table
    pub fn input_entries(&self) -> usize {
        self.input_curves.first().map_or(0, Vec::len)
    }

    /// Entries per output table
    pub fn output_entries(&self) -> usize {
        self.output_curves.first().map_or(0, Vec::len)
    }

    /// Full tag length including the 8-byte type header
    pub fn encoded_len(&self) -> usize {
        8 + FIXED_LEN
            + (self.input_channels as usize * self.input_entries()
                + self.clut.len()
                + self.output_channels as usize * self.output_entries())
                * 2
    }

    /// Check the structural invariants the binary layout depends on
    pub fn validate(&self) -> Result<(), IccError> {
        let expected = clut_entries(self.grid_points, self.input_channels, self.output_channels)
            .ok_or_else(|| IccError::Unrepresentable("CLUT size overflows".to_string()))?;
        if self.clut.len() != expected {
            return Err(IccError::Unrepresentable(format!(
                "CLUT has {} values, layout requires {}",
                self.clut.len(),
                expected
            )));
        }

        let tables = [
            ("input", &self.input_curves, self.input_channels),
            ("output", &self.output_curves, self.output_channels),
        ];
        for (name, curves, channels) in tables {
            if curves.len() != channels as usize {
                return Err(IccError::Unrepresentable(format!(
                    "{} {} curves for {} channels",
                    curves.len(),
                    name,
                    channels
                )));
            }
            let entries = curves.first().map_or(0, Vec::len);
            if !(MIN_TABLE_ENTRIES..=MAX_TABLE_ENTRIES).contains(&entries)
                || curves.iter().any(|c| c.len() != entries)
            {
                return Err(IccError::Unrepresentable(format!(
                    "{} tables must share a length in {}..={}",
                    name, MIN_TABLE_ENTRIES, MAX_TABLE_ENTRIES
                )));
            }
        }
        Ok(())
    }

    /// Serialize including the type signature and reserved bytes
    pub fn encode(&self) -> Result<Vec<u8>, IccError> {
        self.validate()?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&TypeSignature::LUT16.0.to_be_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&[
            self.input_channels,
            self.output_channels,
            self.grid_points,
            0,
        ]);
        for value in self.matrix.iter().flatten() {
            out.extend_from_slice(&value.to_be_bytes());
        }
        out.extend_from_slice(&(self.input_entries() as u16).to_be_bytes());
        out.extend_from_slice(&(self.output_entries() as u16).to_be_bytes());

        let values = self
            .input_curves
            .iter()
            .flatten()
            .chain(&self.clut)
            .chain(self.output_curves.iter().flatten());
        for v in values {
            out.extend_from_slice(&v.to_be_bytes());
        }

        Ok(out)
    }

    /// Check if the matrix is identity
    pub fn matrix_is_identity(&self) -> bool {
        self.matrix == IDENTITY_MATRIX
    }
}
