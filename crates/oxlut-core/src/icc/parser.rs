//! ICC profile decoding
//!
//! Tag ranges are checked against the container before any payload is read:
//! each must lie past the tag table and inside the profile, and two tags may
//! share a range outright but never partially overlap.

use std::collections::HashSet;

use super::error::IccError;
use super::header::{HEADER_SIZE, IccHeader};
use super::tags::{Lut16Data, TagData};
use super::types::TagSignature;

/// Byte length of one tag table entry
pub(crate) const TAG_ENTRY_SIZE: usize = 12;

/// An ICC profile held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct IccProfile {
    /// Profile header (128 bytes)
    pub header: IccHeader,
    /// Tags in tag-table order
    pub tags: Vec<(TagSignature, TagData)>,
}

/// Tag table entry (as stored in profile)
#[derive(Debug, Clone, Copy)]
struct TagTableEntry {
    signature: TagSignature,
    /// Offset from start of profile
    offset: u32,
    /// Size of tag data (unpadded)
    size: u32,
}

impl TagTableEntry {
    fn range(&self) -> (usize, usize) {
        let start = self.offset as usize;
        (start, start + self.size as usize)
    }
}

impl IccProfile {
    /// Profile with no tags yet
    pub fn new(header: IccHeader) -> Self {
        Self {
            header,
            tags: Vec::new(),
        }
    }

    /// Parse an ICC profile from bytes
    pub fn parse(data: &[u8]) -> Result<Self, IccError> {
        let header = IccHeader::parse(data)?;
        header.validate(data.len())?;

        let tag_count = Self::parse_tag_count(data)?;
        let entries = Self::parse_tag_table(data, tag_count)?;
        let table_end = HEADER_SIZE + 4 + tag_count * TAG_ENTRY_SIZE;

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.signature) {
                return Err(IccError::DuplicateTag(entry.signature));
            }

            let (start, end) = entry.range();
            if start < table_end || end > data.len() {
                return Err(IccError::TagOutOfBounds {
                    tag: entry.signature,
                    offset: entry.offset,
                    size: entry.size,
                    profile_size: data.len(),
                });
            }
        }

        Self::check_overlaps(&entries)?;

        let mut tags = Vec::with_capacity(entries.len());
        for entry in &entries {
            let (start, end) = entry.range();
            let parsed = TagData::parse(&data[start..end], entry.signature)?;
            tags.push((entry.signature, parsed));
        }

        Ok(Self { header, tags })
    }

    /// Get the number of tags in the profile
    fn parse_tag_count(data: &[u8]) -> Result<usize, IccError> {
        if data.len() < HEADER_SIZE + 4 {
            return Err(IccError::TooSmall {
                expected: HEADER_SIZE + 4,
                actual: data.len(),
            });
        }

        let count = u32::from_be_bytes([data[128], data[129], data[130], data[131]]) as usize;
        Ok(count)
    }

    /// Parse the tag table
    fn parse_tag_table(data: &[u8], count: usize) -> Result<Vec<TagTableEntry>, IccError> {
        let table_start = HEADER_SIZE + 4;
        let required_size = count
            .checked_mul(TAG_ENTRY_SIZE)
            .and_then(|len| len.checked_add(table_start))
            .unwrap_or(usize::MAX);

        if data.len() < required_size {
            return Err(IccError::TooSmall {
                expected: required_size,
                actual: data.len(),
            });
        }

        let field = |at: usize| u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        Ok((0..count)
            .map(|i| {
                let offset = table_start + i * TAG_ENTRY_SIZE;
                TagTableEntry {
                    signature: TagSignature(field(offset)),
                    offset: field(offset + 4),
                    size: field(offset + 8),
                }
            })
            .collect())
    }

    /// Ranges may be shared outright but never partially intersect
    fn check_overlaps(entries: &[TagTableEntry]) -> Result<(), IccError> {
        let mut sorted: Vec<&TagTableEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.range());

        let mut furthest: Option<&TagTableEntry> = None;
        for entry in sorted {
            if let Some(prev) = furthest {
                let (start, end) = entry.range();
                let (prev_start, prev_end) = prev.range();
                let identical = start == prev_start && end == prev_end;
                if !identical && start < prev_end {
                    return Err(IccError::TagOverlap {
                        first: prev.signature,
                        second: entry.signature,
                    });
                }
                if end > prev_end {
                    furthest = Some(entry);
                }
            } else {
                furthest = Some(entry);
            }
        }
        Ok(())
    }

    /// Get a tag by signature
    pub fn get_tag(&self, sig: TagSignature) -> Option<&TagData> {
        self.tags
            .iter()
            .find(|(tag, _)| *tag == sig)
            .map(|(_, data)| data)
    }

    /// Insert or replace a tag, keeping the position of an existing one
    pub fn set_tag(&mut self, sig: TagSignature, data: TagData) {
        match self.tags.iter_mut().find(|(tag, _)| *tag == sig) {
            Some(slot) => slot.1 = data,
            None => self.tags.push((sig, data)),
        }
    }

    /// Get the A2B0 tag as a 16-bit LUT
    pub fn a2b0(&self) -> Option<&Lut16Data> {
        self.get_tag(TagSignature::A2B0).and_then(TagData::as_lut16)
    }

    /// Get profile description
    pub fn description(&self) -> Option<String> {
        self.get_tag(TagSignature::DESC)
            .and_then(|t| t.as_text())
            .map(|t| t.text.clone())
    }

    /// Get copyright text
    pub fn copyright(&self) -> Option<String> {
        self.get_tag(TagSignature::COPYRIGHT)
            .and_then(|t| t.as_text())
            .map(|t| t.text.clone())
    }

    /// Get number of tags
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}
