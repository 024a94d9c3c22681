//! ICC Codec Error Types

use std::fmt;

use super::types::TagSignature;

/// Errors raised while encoding or decoding an ICC container
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IccError {
    /// Profile data is too small
    TooSmall { expected: usize, actual: usize },
    /// Invalid profile signature (should be 'acsp')
    InvalidSignature(u32),
    /// Profile size in header doesn't match data
    SizeMismatch {
        header_size: u32,
        actual_size: usize,
    },
    /// Tag range lies outside the tag data area
    TagOutOfBounds {
        tag: TagSignature,
        offset: u32,
        size: u32,
        profile_size: usize,
    },
    /// Two tags claim intersecting but non-identical byte ranges
    TagOverlap { first: TagSignature, second: TagSignature },
    /// Tag-table size disagrees with the length implied by the payload
    TagSizeMismatch {
        tag: TagSignature,
        table_size: u32,
        implied_size: usize,
    },
    /// Type signature not valid for this tag
    InvalidTagType { tag: TagSignature, type_sig: u32 },
    /// Same tag signature appears twice
    DuplicateTag(TagSignature),
    /// Invalid color space
    InvalidColorSpace(u32),
    /// Invalid profile class
    InvalidProfileClass(u32),
    /// Invalid rendering intent
    InvalidRenderingIntent(u32),
    /// Truncated or internally inconsistent payload
    CorruptedData(String),
    /// Value cannot be represented in the container
    Unrepresentable(String),
}

impl fmt::Display for IccError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall { expected, actual } => {
                write!(
                    f,
                    "Profile too small: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Self::InvalidSignature(sig) => {
                write!(
                    f,
                    "Invalid profile signature: 0x{:08X} (expected 'acsp')",
                    sig
                )
            }
            Self::SizeMismatch {
                header_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Size mismatch: header says {} bytes, data is {} bytes",
                    header_size, actual_size
                )
            }
            Self::TagOutOfBounds {
                tag,
                offset,
                size,
                profile_size,
            } => {
                write!(
                    f,
                    "Tag '{}' out of bounds: offset {} + size {} in profile of {} bytes",
                    tag, offset, size, profile_size
                )
            }
            Self::TagOverlap { first, second } => {
                write!(f, "Tags '{}' and '{}' overlap", first, second)
            }
            Self::TagSizeMismatch {
                tag,
                table_size,
                implied_size,
            } => {
                write!(
                    f,
                    "Tag '{}' size mismatch: tag table says {} bytes, payload implies {}",
                    tag, table_size, implied_size
                )
            }
            Self::InvalidTagType { tag, type_sig } => {
                write!(f, "Invalid type 0x{:08X} for tag '{}'", type_sig, tag)
            }
            Self::DuplicateTag(tag) => write!(f, "Duplicate tag '{}'", tag),
            Self::InvalidColorSpace(cs) => {
                write!(f, "Invalid color space: 0x{:08X}", cs)
            }
            Self::InvalidProfileClass(class) => {
                write!(f, "Invalid profile class: 0x{:08X}", class)
            }
            Self::InvalidRenderingIntent(intent) => {
                write!(f, "Invalid rendering intent: {}", intent)
            }
            Self::CorruptedData(msg) => write!(f, "Corrupted data: {}", msg),
            Self::Unrepresentable(msg) => write!(f, "Unrepresentable value: {}", msg),
        }
    }
}

impl std::error::Error for IccError {}
