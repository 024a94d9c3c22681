//! ICC Basic Types
//!
//! Fixed-point numbers, signatures and timestamps as laid out in ICC.1:2022.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// ICC Tag Signature (4-byte ASCII code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagSignature(pub u32);

impl TagSignature {
    /// Create from 4 ASCII characters
    pub const fn from_bytes(b: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(b))
    }

    pub const A2B0: Self = Self::from_bytes(*b"A2B0");
    pub const COPYRIGHT: Self = Self::from_bytes(*b"cprt");
    pub const DESC: Self = Self::from_bytes(*b"desc");
    pub const PROFILE_SEQUENCE: Self = Self::from_bytes(*b"pseq");
}

impl fmt::Display for TagSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            f.write_str(&String::from_utf8_lossy(&bytes))
        } else {
            write!(f, "0x{:08X}", self.0)
        }
    }
}

/// Type signatures for ICC tag data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSignature(pub u32);

impl TypeSignature {
    pub const fn from_bytes(b: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(b))
    }

    pub const TEXT: Self = Self::from_bytes(*b"text");
    pub const DESC: Self = Self::from_bytes(*b"desc");
    pub const MLUC: Self = Self::from_bytes(*b"mluc");
    pub const LUT16: Self = Self::from_bytes(*b"mft2");
    pub const PSEQ: Self = Self::from_bytes(*b"pseq");
}

/// s15Fixed16Number - signed 16.16 fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct S15Fixed16(pub i32);

impl S15Fixed16 {
    pub const ONE: Self = Self(0x0001_0000);
    pub const ZERO: Self = Self(0);

    /// Round to the nearest representable value, saturating at the type bounds
    pub fn from_f64(val: f64) -> Self {
        let raw = (val * 65536.0).round();
        Self(raw.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 65536.0
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(i32::from_be_bytes(bytes))
    }

    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

/// dateTimeNumber - ICC date/time (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeNumber {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

impl DateTimeNumber {
    /// Parse from 12 bytes (big-endian)
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 12 {
            return None;
        }
        let field = |i: usize| u16::from_be_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
        Some(Self {
            year: field(0),
            month: field(1),
            day: field(2),
            hour: field(3),
            minute: field(4),
            second: field(5),
        })
    }

    pub fn to_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        let fields = [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ];
        for (chunk, value) in out.chunks_exact_mut(2).zip(fields) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        out
    }

    /// Fields within calendar and clock ranges, or all zero (unset)
    pub fn is_valid(&self) -> bool {
        *self == Self::default()
            || ((1..=12).contains(&self.month)
                && (1..=31).contains(&self.day)
                && self.hour < 24
                && self.minute < 60
                && self.second < 60)
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            year: dt.year().clamp(0, u16::MAX as i32) as u16,
            month: dt.month() as u16,
            day: dt.day() as u16,
            hour: dt.hour() as u16,
            minute: dt.minute() as u16,
            second: dt.second().min(59) as u16,
        }
    }

    /// Current UTC time
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s15fixed16() {
        assert_eq!(S15Fixed16::from_f64(1.0), S15Fixed16::ONE);
        assert!((S15Fixed16::from_f64(0.5).to_f64() - 0.5).abs() < 1e-9);
        assert!((S15Fixed16::from_f64(-1.5).to_f64() + 1.5).abs() < 1e-9);
        assert_eq!(S15Fixed16::from_f64(1.0).to_be_bytes(), [0, 1, 0, 0]);

        // Saturates instead of wrapping
        assert_eq!(S15Fixed16::from_f64(1e9).0, i32::MAX);
    }

    #[test]
    fn test_datetime_bytes() {
        let dt = DateTimeNumber {
            year: 2024,
            month: 2,
            day: 29,
            hour: 23,
            minute: 59,
            second: 1,
        };
        let bytes = dt.to_bytes();
        assert_eq!(&bytes[0..2], &2024u16.to_be_bytes());
        assert_eq!(DateTimeNumber::from_bytes(&bytes), Some(dt));
    }

    #[test]
    fn test_datetime_ranges() {
        assert!(DateTimeNumber::default().is_valid());
        let dt = DateTimeNumber {
            year: 2024,
            month: 12,
            day: 31,
            hour: 23,
            minute: 59,
            second: 59,
        };
        assert!(dt.is_valid());
        assert!(!DateTimeNumber { month: 13, ..dt }.is_valid());
        assert!(!DateTimeNumber { day: 0, ..dt }.is_valid());
        assert!(!DateTimeNumber { hour: 24, ..dt }.is_valid());
    }

    #[test]
    fn test_tag_signature_display() {
        assert_eq!(TagSignature::DESC.to_string(), "desc");
        assert_eq!(TagSignature::A2B0.to_string(), "A2B0");
        assert_eq!(TagSignature(1).to_string(), "0x00000001");
    }
}
