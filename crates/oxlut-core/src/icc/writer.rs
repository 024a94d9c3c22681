//! ICC Profile Writer
//!
//! Serializes an [`IccProfile`] into the on-disk container:
//! header, tag count, tag table, then 4-byte aligned payloads.
//!
//! Payloads with identical bytes are stored once; every tag naming them
//! points at the same offset. The interning map is keyed by payload content.

use std::collections::HashMap;

use super::error::IccError;
use super::header::HEADER_SIZE;
use super::parser::{IccProfile, TAG_ENTRY_SIZE};

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

fn to_u32(value: usize, what: &str) -> Result<u32, IccError> {
    u32::try_from(value)
        .map_err(|_| IccError::Unrepresentable(format!("{} {} exceeds u32", what, value)))
}

impl IccProfile {
    /// Encode to bytes. The header size field is set from the result.
    pub fn encode(&self) -> Result<Vec<u8>, IccError> {
        let payloads = self
            .tags
            .iter()
            .map(|(_, data)| data.encode())
            .collect::<Result<Vec<_>, _>>()?;

        let table_len = 4 + self.tags.len() * TAG_ENTRY_SIZE;
        let data_start = HEADER_SIZE + table_len;

        let mut interned: HashMap<&[u8], u32> = HashMap::with_capacity(payloads.len());
        let mut table = Vec::with_capacity(table_len);
        let mut body = Vec::new();

        table.extend_from_slice(&to_u32(self.tags.len(), "tag count")?.to_be_bytes());

        for ((sig, _), payload) in self.tags.iter().zip(&payloads) {
            let offset = match interned.get(payload.as_slice()) {
                Some(&offset) => offset,
                None => {
                    let offset = to_u32(data_start + body.len(), "tag offset")?;
                    body.extend_from_slice(payload);
                    body.resize(padded(body.len()), 0);
                    interned.insert(payload.as_slice(), offset);
                    offset
                }
            };

            table.extend_from_slice(&sig.0.to_be_bytes());
            table.extend_from_slice(&offset.to_be_bytes());
            table.extend_from_slice(&to_u32(payload.len(), "tag size")?.to_be_bytes());
        }

        let mut header = self.header.clone();
        header.size = to_u32(data_start + body.len(), "profile size")?;

        let mut out = Vec::with_capacity(header.size as usize);
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&table);
        out.extend_from_slice(&body);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icc::header::{IccHeader, RenderingIntent};
    use crate::icc::tags::{TagData, TextData};
    use crate::icc::types::{DateTimeNumber, TagSignature};

    fn profile() -> IccProfile {
        IccProfile::new(IccHeader::device_link(
            RenderingIntent::Perceptual,
            DateTimeNumber::default(),
        ))
    }

    #[test]
    fn test_payloads_are_aligned() {
        let mut p = profile();
        p.set_tag(TagSignature::COPYRIGHT, TagData::Text(TextData::new("abc")));
        p.set_tag(TagSignature::DESC, TagData::Description(TextData::new("desc")));

        let bytes = p.encode().unwrap();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
            bytes.len()
        );

        // cprt: 8 + 3 + 1 = 12 bytes unpadded, at 156
        assert_eq!(&bytes[136..140], &156u32.to_be_bytes());
        assert_eq!(&bytes[140..144], &12u32.to_be_bytes());
        // desc follows immediately since 12 is already aligned
        assert_eq!(&bytes[148..152], &168u32.to_be_bytes());

        let back = IccProfile::parse(&bytes).unwrap();
        assert_eq!(back.tags, p.tags);
    }

    #[test]
    fn test_identical_payloads_share_offset() {
        let mut p = profile();
        p.set_tag(TagSignature::COPYRIGHT, TagData::Text(TextData::new("same")));
        p.set_tag(TagSignature(u32::from_be_bytes(*b"dmnd")), TagData::Text(TextData::new("same")));

        let bytes = p.encode().unwrap();
        assert_eq!(&bytes[136..140], &bytes[148..152]);
        // header + count + 2 entries + one padded payload (13 -> 16)
        assert_eq!(bytes.len(), 128 + 4 + 24 + 16);

        let back = IccProfile::parse(&bytes).unwrap();
        assert_eq!(back.tag_count(), 2);
    }

    #[test]
    fn test_mluc_not_writable() {
        let mut p = profile();
        p.set_tag(
            TagSignature::DESC,
            TagData::MultiLocalizedUnicode(TextData::with_unicode("x")),
        );
        assert!(matches!(p.encode(), Err(IccError::Unrepresentable(_))));
    }
}
