//! Text Tag Types
//!
//! - text: Simple ASCII text (copyright)
//! - desc: Profile description (v2 textDescriptionType), ASCII with optional Unicode
//! - mluc: Multi-localized Unicode (v4), decode only
//!
//! See ICC.1:2022 Sections 10.24 (text), 10.15 (mluc) and ICC.1:2001-04 6.5.17 (desc)

use crate::icc::error::IccError;
use crate::icc::types::TypeSignature;

/// Unicode language code for desc tags (0 = unspecified)
const DESC_UNICODE_LANGUAGE: u32 = 0;

/// Length of the fixed ScriptCode block closing a desc tag
const SCRIPTCODE_LEN: usize = 2 + 1 + 67;

/// Text tag data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextData {
    /// ASCII (or primary) text
    pub text: String,
    /// Unicode rendition, when the tag carries one
    pub unicode: Option<String>,
}

impl TextData {
    /// ASCII-only text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            unicode: None,
        }
    }

    /// Text with a Unicode rendition alongside the ASCII one
    pub fn with_unicode(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            unicode: Some(text.clone()),
            text,
        }
    }

    /// Parse 'text' type payload (after the 8-byte type header)
    pub fn parse_text(data: &[u8]) -> Result<Self, IccError> {
        if !data.contains(&0) {
            return Err(IccError::CorruptedData(
                "text tag is not NUL-terminated".to_string(),
            ));
        }
        Ok(Self::new(ascii_until_nul(data)))
    }

    /// Parse 'desc' type payload (after the 8-byte type header)
    pub fn parse_desc(data: &[u8]) -> Result<Self, IccError> {
        let truncated = || IccError::CorruptedData("Description tag truncated".to_string());

        let ascii_count = read_u32(data, 0).ok_or_else(truncated)? as usize;
        let ascii = data.get(4..4 + ascii_count).ok_or_else(truncated)?;
        let text = ascii_until_nul(ascii);

        let mut pos = 4 + ascii_count;
        let _language = read_u32(data, pos).ok_or_else(truncated)?;
        let unicode_count = read_u32(data, pos + 4).ok_or_else(truncated)? as usize;
        pos += 8;

        let unicode = if unicode_count > 0 {
            let raw = data
                .get(pos..pos + unicode_count * 2)
                .ok_or_else(truncated)?;
            pos += unicode_count * 2;
            Some(decode_utf16be(raw).ok_or_else(|| {
                IccError::CorruptedData("Description Unicode text is not UTF-16".to_string())
            })?)
        } else {
            None
        };

        if data.len() < pos + SCRIPTCODE_LEN {
            return Err(truncated());
        }

        Ok(Self { text, unicode })
    }

    /// Parse 'mluc' type; `tag` is the whole tag including the type header,
    /// because record offsets are relative to the tag start
    pub fn parse_mluc(tag: &[u8]) -> Result<Self, IccError> {
        let truncated = || IccError::CorruptedData("mluc tag truncated".to_string());

        let record_count = read_u32(tag, 8).ok_or_else(truncated)? as usize;
        let record_size = read_u32(tag, 12).ok_or_else(truncated)? as usize;
        if record_size < 12 {
            return Err(IccError::CorruptedData(format!(
                "mluc record size {} too small",
                record_size
            )));
        }

        let mut first = None;
        for i in 0..record_count {
            let base = 16 + i * record_size;
            let len = read_u32(tag, base + 4).ok_or_else(truncated)? as usize;
            let offset = read_u32(tag, base + 8).ok_or_else(truncated)? as usize;
            let raw = tag.get(offset..offset + len).ok_or_else(truncated)?;
            let text = decode_utf16be(raw).ok_or_else(|| {
                IccError::CorruptedData("mluc record is not UTF-16".to_string())
            })?;
            if first.is_none() {
                first = Some(text);
            }
        }

        let text = first.unwrap_or_default();
        Ok(Self {
            unicode: Some(text.clone()),
            text,
        })
    }

    /// Encode as 'text' type (copyright)
    pub fn encode_text(&self) -> Vec<u8> {
        let ascii = asciize(&self.text);
        let mut out = Vec::with_capacity(8 + ascii.len() + 1);
        out.extend_from_slice(&TypeSignature::TEXT.0.to_be_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&ascii);
        out.push(0);
        out
    }

    /// Encode as v2 'desc' type. Unicode is written only when present.
    pub fn encode_desc(&self) -> Vec<u8> {
        let ascii = asciize(&self.text);
        let mut out = Vec::new();
        out.extend_from_slice(&TypeSignature::DESC.0.to_be_bytes());
        out.extend_from_slice(&[0u8; 4]);

        out.extend_from_slice(&((ascii.len() + 1) as u32).to_be_bytes());
        out.extend_from_slice(&ascii);
        out.push(0);

        out.extend_from_slice(&DESC_UNICODE_LANGUAGE.to_be_bytes());
        match &self.unicode {
            Some(unicode) => {
                let units: Vec<u16> = unicode.encode_utf16().chain(std::iter::once(0)).collect();
                out.extend_from_slice(&(units.len() as u32).to_be_bytes());
                for unit in units {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
            None => out.extend_from_slice(&0u32.to_be_bytes()),
        }

        out.extend_from_slice(&[0u8; SCRIPTCODE_LEN]);
        out
    }
}

/// Replace anything outside printable ASCII with '?'
fn asciize(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .collect()
}

fn ascii_until_nul(data: &[u8]) -> String {
    data.iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode UTF-16BE bytes to String, stopping at a NUL unit
fn decode_utf16be(data: &[u8]) -> Option<String> {
    if data.len() % 2 != 0 {
        return None;
    }

    let utf16: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .take_while(|&c| c != 0)
        .collect();

    String::from_utf16(&utf16).ok()
}
