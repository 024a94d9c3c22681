//! ICC Tag Payloads
//!
//! Each tag payload starts with:
//! - A 4-byte type signature identifying the data format
//! - 4 reserved zero bytes
//! - Type-specific data
//!
//! See ICC.1:2022 Section 9.

mod lut;
mod text;

pub use lut::{IDENTITY_MATRIX, Lut16Data, MAX_TABLE_ENTRIES, MIN_TABLE_ENTRIES};
pub use text::TextData;

use super::error::IccError;
use super::types::{TagSignature, TypeSignature};

/// Parsed tag data
#[derive(Debug, Clone, PartialEq)]
pub enum TagData {
    /// 16-bit LUT (mft2)
    Lut16(Lut16Data),
    /// Simple ASCII text (text)
    Text(TextData),
    /// v2 profile description (desc)
    Description(TextData),
    /// Multi-localized Unicode (mluc), decode only
    MultiLocalizedUnicode(TextData),
    /// Any other type, kept byte for byte (type header included)
    Raw { type_sig: u32, data: Vec<u8> },
}

impl TagData {
    /// Parse one tag payload.
    ///
    /// `data` is exactly the byte range named by the tag table.
    pub fn parse(data: &[u8], tag: TagSignature) -> Result<Self, IccError> {
        if data.len() < 8 {
            return Err(IccError::CorruptedData(format!(
                "Tag '{}' too small for type header",
                tag
            )));
        }

        let type_sig = TypeSignature(u32::from_be_bytes([data[0], data[1], data[2], data[3]]));
        let type_data = &data[8..];

        let allowed: &[TypeSignature] = match tag {
            TagSignature::A2B0 => &[TypeSignature::LUT16],
            TagSignature::DESC => &[TypeSignature::DESC, TypeSignature::MLUC],
            TagSignature::COPYRIGHT => &[
                TypeSignature::TEXT,
                TypeSignature::DESC,
                TypeSignature::MLUC,
            ],
            _ => &[],
        };
        if !allowed.is_empty() && !allowed.contains(&type_sig) {
            return Err(IccError::InvalidTagType {
                tag,
                type_sig: type_sig.0,
            });
        }

        match type_sig {
            TypeSignature::LUT16 => {
                let lut = Lut16Data::parse(type_data)?;
                if lut.encoded_len() != data.len() {
                    return Err(IccError::TagSizeMismatch {
                        tag,
                        table_size: data.len() as u32,
                        implied_size: lut.encoded_len(),
                    });
                }
                Ok(TagData::Lut16(lut))
            }
            TypeSignature::TEXT => Ok(TagData::Text(TextData::parse_text(type_data)?)),
            TypeSignature::DESC => Ok(TagData::Description(TextData::parse_desc(type_data)?)),
            TypeSignature::MLUC => Ok(TagData::MultiLocalizedUnicode(TextData::parse_mluc(
                data,
            )?)),
            _ => Ok(TagData::Raw {
                type_sig: type_sig.0,
                data: data.to_vec(),
            }),
        }
    }

    /// Serialize to the unpadded payload bytes
    pub fn encode(&self) -> Result<Vec<u8>, IccError> {
        match self {
            TagData::Lut16(lut) => lut.encode(),
            TagData::Text(text) => Ok(text.encode_text()),
            TagData::Description(text) => Ok(text.encode_desc()),
            TagData::MultiLocalizedUnicode(_) => Err(IccError::Unrepresentable(
                "mluc encoding is not supported, use a desc tag".to_string(),
            )),
            TagData::Raw { data, .. } => Ok(data.clone()),
        }
    }

    /// profileSequenceDescType with zero entries
    pub fn empty_profile_sequence() -> Self {
        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&TypeSignature::PSEQ.0.to_be_bytes());
        data.extend_from_slice(&[0u8; 8]);
        TagData::Raw {
            type_sig: TypeSignature::PSEQ.0,
            data,
        }
    }

    /// Text content of any text-like tag
    pub fn as_text(&self) -> Option<&TextData> {
        match self {
            TagData::Text(text)
            | TagData::Description(text)
            | TagData::MultiLocalizedUnicode(text) => Some(text),
            _ => None,
        }
    }

    /// Get as Lut16 data
    pub fn as_lut16(&self) -> Option<&Lut16Data> {
        match self {
            TagData::Lut16(lut) => Some(lut),
            _ => None,
        }
    }
}
