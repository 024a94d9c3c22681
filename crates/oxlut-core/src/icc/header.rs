//! ICC Profile Header
//!
//! The ICC profile header is exactly 128 bytes and contains basic profile information.
//! See ICC.1:2022 Section 7.2.

use serde::{Deserialize, Serialize};

use super::error::IccError;
use super::types::{DateTimeNumber, S15Fixed16};

/// Profile file signature - must be 'acsp' (0x61637370)
pub const PROFILE_SIGNATURE: u32 = 0x61637370;

/// Header length in bytes
pub const HEADER_SIZE: usize = 128;

/// Creator signature written into profiles produced here
pub const CREATOR_SIGNATURE: u32 = u32::from_be_bytes(*b"oxlt");

/// PCS illuminant D50 as s15Fixed16 (X, Y, Z)
pub const D50_ILLUMINANT: [S15Fixed16; 3] = [
    S15Fixed16(0x0000_F6D6),
    S15Fixed16(0x0001_0000),
    S15Fixed16(0x0000_D32D),
];

/// ICC Profile Header (128 bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct IccHeader {
    /// Profile size in bytes (padded container length)
    pub size: u32,
    /// Preferred CMM type signature
    pub cmm_type: u32,
    /// Profile version (major.minor.patch)
    pub version: ProfileVersion,
    /// Device class
    pub device_class: ProfileClass,
    /// Color space of data
    pub color_space: ColorSpace,
    /// Profile connection space (output space for device links)
    pub pcs: ColorSpace,
    /// Date and time profile was created
    pub creation_date: DateTimeNumber,
    /// Primary platform signature
    pub platform: u32,
    /// Profile flags
    pub flags: u32,
    /// Device manufacturer signature
    pub manufacturer: u32,
    /// Device model signature
    pub model: u32,
    /// Device attributes
    pub attributes: u64,
    /// Rendering intent
    pub rendering_intent: RenderingIntent,
    /// PCS illuminant
    pub illuminant: [S15Fixed16; 3],
    /// Profile creator signature
    pub creator: u32,
    /// Profile ID (MD5 hash, or zero)
    pub profile_id: [u8; 16],
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl IccHeader {
    /// Header for an RGB → RGB device link; `size` is filled in by the writer
    pub fn device_link(intent: RenderingIntent, creation_date: DateTimeNumber) -> Self {
        Self {
            size: 0,
            cmm_type: 0,
            version: ProfileVersion {
                major: 2,
                minor: 4,
                patch: 0,
            },
            device_class: ProfileClass::DeviceLink,
            color_space: ColorSpace::Rgb,
            pcs: ColorSpace::Rgb,
            creation_date,
            platform: 0,
            flags: 0,
            manufacturer: 0,
            model: 0,
            attributes: 0,
            rendering_intent: intent,
            illuminant: D50_ILLUMINANT,
            creator: CREATOR_SIGNATURE,
            profile_id: [0; 16],
        }
    }

    /// Parse header from bytes
    pub fn parse(data: &[u8]) -> Result<Self, IccError> {
        if data.len() < HEADER_SIZE {
            return Err(IccError::TooSmall {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let signature = be_u32(data, 36);
        if signature != PROFILE_SIGNATURE {
            return Err(IccError::InvalidSignature(signature));
        }

        let version = ProfileVersion {
            major: data[8],
            minor: data[9] >> 4,
            patch: data[9] & 0x0F,
        };

        let creation_date = DateTimeNumber::from_bytes(&data[24..36])
            .filter(DateTimeNumber::is_valid)
            .ok_or_else(|| {
                IccError::CorruptedData(format!(
                    "creation date out of range: {:02X?}",
                    &data[24..36]
                ))
            })?;

        let mut attributes = [0u8; 8];
        attributes.copy_from_slice(&data[56..64]);

        let illuminant = [
            S15Fixed16(be_u32(data, 68) as i32),
            S15Fixed16(be_u32(data, 72) as i32),
            S15Fixed16(be_u32(data, 76) as i32),
        ];

        let mut profile_id = [0u8; 16];
        profile_id.copy_from_slice(&data[84..100]);

        Ok(Self {
            size: be_u32(data, 0),
            cmm_type: be_u32(data, 4),
            version,
            device_class: ProfileClass::from_u32(be_u32(data, 12))?,
            color_space: ColorSpace::from_u32(be_u32(data, 16))?,
            pcs: ColorSpace::from_u32(be_u32(data, 20))?,
            creation_date,
            platform: be_u32(data, 40),
            flags: be_u32(data, 44),
            manufacturer: be_u32(data, 48),
            model: be_u32(data, 52),
            attributes: u64::from_be_bytes(attributes),
            rendering_intent: RenderingIntent::from_u32(be_u32(data, 64))?,
            illuminant,
            creator: be_u32(data, 80),
            profile_id,
        })
    }

    /// Serialize to the 128-byte on-disk form; bytes 100..128 stay zero
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut put = |at: usize, bytes: &[u8]| out[at..at + bytes.len()].copy_from_slice(bytes);

        put(0, &self.size.to_be_bytes());
        put(4, &self.cmm_type.to_be_bytes());
        put(8, &[self.version.major, (self.version.minor << 4) | (self.version.patch & 0x0F)]);
        put(12, &self.device_class.to_u32().to_be_bytes());
        put(16, &self.color_space.to_u32().to_be_bytes());
        put(20, &self.pcs.to_u32().to_be_bytes());
        put(24, &self.creation_date.to_bytes());
        put(36, &PROFILE_SIGNATURE.to_be_bytes());
        put(40, &self.platform.to_be_bytes());
        put(44, &self.flags.to_be_bytes());
        put(48, &self.manufacturer.to_be_bytes());
        put(52, &self.model.to_be_bytes());
        put(56, &self.attributes.to_be_bytes());
        put(64, &self.rendering_intent.to_u32().to_be_bytes());
        for (i, v) in self.illuminant.iter().enumerate() {
            put(68 + i * 4, &v.to_be_bytes());
        }
        put(80, &self.creator.to_be_bytes());
        put(84, &self.profile_id);

        out
    }

    /// Check the declared size against the container length
    pub fn validate(&self, data_len: usize) -> Result<(), IccError> {
        if self.size as usize != data_len {
            return Err(IccError::SizeMismatch {
                header_size: self.size,
                actual_size: data_len,
            });
        }
        Ok(())
    }
}

/// ICC Profile Version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// ICC Profile Class (Device Class)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileClass {
    Input,
    Display,
    Output,
    DeviceLink,
    ColorSpace,
    Abstract,
    NamedColor,
}

impl ProfileClass {
    pub fn from_u32(val: u32) -> Result<Self, IccError> {
        match &val.to_be_bytes() {
            b"scnr" => Ok(Self::Input),
            b"mntr" => Ok(Self::Display),
            b"prtr" => Ok(Self::Output),
            b"link" => Ok(Self::DeviceLink),
            b"spac" => Ok(Self::ColorSpace),
            b"abst" => Ok(Self::Abstract),
            b"nmcl" => Ok(Self::NamedColor),
            _ => Err(IccError::InvalidProfileClass(val)),
        }
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(*match self {
            Self::Input => b"scnr",
            Self::Display => b"mntr",
            Self::Output => b"prtr",
            Self::DeviceLink => b"link",
            Self::ColorSpace => b"spac",
            Self::Abstract => b"abst",
            Self::NamedColor => b"nmcl",
        })
    }
}

/// ICC Color Space, limited to the spaces a device link here can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Xyz,
    Lab,
    Rgb,
    Gray,
    Cmyk,
}

impl ColorSpace {
    pub fn from_u32(val: u32) -> Result<Self, IccError> {
        match &val.to_be_bytes() {
            b"XYZ " => Ok(Self::Xyz),
            b"Lab " => Ok(Self::Lab),
            b"RGB " => Ok(Self::Rgb),
            b"GRAY" => Ok(Self::Gray),
            b"CMYK" => Ok(Self::Cmyk),
            _ => Err(IccError::InvalidColorSpace(val)),
        }
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(*match self {
            Self::Xyz => b"XYZ ",
            Self::Lab => b"Lab ",
            Self::Rgb => b"RGB ",
            Self::Gray => b"GRAY",
            Self::Cmyk => b"CMYK",
        })
    }
}

/// ICC Rendering Intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingIntent {
    /// Perceptual - best for photographs
    #[default]
    Perceptual,
    /// Relative colorimetric - preserves in-gamut colors
    RelativeColorimetric,
    /// Saturation - maintains saturation
    Saturation,
    /// Absolute colorimetric - preserves white point
    AbsoluteColorimetric,
}

impl RenderingIntent {
    pub fn from_u32(val: u32) -> Result<Self, IccError> {
        match val {
            0 => Ok(Self::Perceptual),
            1 => Ok(Self::RelativeColorimetric),
            2 => Ok(Self::Saturation),
            3 => Ok(Self::AbsoluteColorimetric),
            _ => Err(IccError::InvalidRenderingIntent(val)),
        }
    }

    pub fn to_u32(&self) -> u32 {
        match self {
            Self::Perceptual => 0,
            Self::RelativeColorimetric => 1,
            Self::Saturation => 2,
            Self::AbsoluteColorimetric => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> IccHeader {
        let date = DateTimeNumber {
            year: 2023,
            month: 6,
            day: 1,
            hour: 12,
            minute: 0,
            second: 0,
        };
        IccHeader::device_link(RenderingIntent::RelativeColorimetric, date)
    }

    #[test]
    fn test_header_roundtrip() {
        let mut header = sample_header();
        header.size = 4096;
        let bytes = header.to_bytes();

        assert_eq!(&bytes[12..16], b"link");
        assert_eq!(&bytes[16..20], b"RGB ");
        assert_eq!(&bytes[36..40], b"acsp");
        assert_eq!(&bytes[80..84], b"oxlt");
        assert_eq!(bytes[8], 2);
        assert_eq!(bytes[9], 0x40);

        let back = IccHeader::parse(&bytes).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn test_bad_creation_date() {
        let mut bytes = sample_header().to_bytes();
        bytes[26..28].copy_from_slice(&13u16.to_be_bytes());
        assert!(matches!(
            IccHeader::parse(&bytes),
            Err(IccError::CorruptedData(_))
        ));

        // An unset date is accepted
        bytes[24..36].fill(0);
        let header = IccHeader::parse(&bytes).unwrap();
        assert_eq!(header.creation_date, DateTimeNumber::default());
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = sample_header().to_bytes();
        bytes[36..40].copy_from_slice(b"nope");
        assert!(matches!(
            IccHeader::parse(&bytes),
            Err(IccError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_size_validation() {
        let mut header = sample_header();
        header.size = 200;
        assert!(header.validate(200).is_ok());
        assert!(header.validate(204).is_err());
    }

    #[test]
    fn test_profile_class_roundtrip() {
        for class in [
            ProfileClass::Input,
            ProfileClass::Display,
            ProfileClass::Output,
            ProfileClass::DeviceLink,
        ] {
            assert_eq!(ProfileClass::from_u32(class.to_u32()).unwrap(), class);
        }
    }

    #[test]
    fn test_rendering_intent() {
        for i in 0..4 {
            let intent = RenderingIntent::from_u32(i).unwrap();
            assert_eq!(intent.to_u32(), i);
        }
        assert!(RenderingIntent::from_u32(4).is_err());
    }
}
