//! Device-link codec tests
//!
//! Encode/decode fidelity, CLUT layout, payload interning, and rejection of
//! malformed containers.

use lut_tests::{GridPattern, compare_grids, generate_grid};
use oxlut_core::icc::{
    DateTimeNumber, IccHeader, IccProfile, RenderingIntent, TagData, TagSignature, TextData,
};
use oxlut_core::{ColorGrid, DeviceLinkBuilder, ErrorKind, Lut3d};

const TABLE_START: usize = 132;

fn fixed_date() -> DateTimeNumber {
    DateTimeNumber {
        year: 2024,
        month: 6,
        day: 1,
        hour: 12,
        minute: 0,
        second: 0,
    }
}

fn encode(grid: &ColorGrid) -> Vec<u8> {
    DeviceLinkBuilder::new()
        .with_creation_date(fixed_date())
        .encode(&Lut3d::from_grid(grid.clone()))
        .expect("encode")
}

fn decode(bytes: &[u8]) -> ColorGrid {
    let profile = IccProfile::parse(bytes).expect("parse");
    Lut3d::from_profile(&profile).expect("lut").bake()
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

/// (signature, offset, size) of tag table entry `i`
fn entry(bytes: &[u8], i: usize) -> (TagSignature, usize, usize) {
    let at = TABLE_START + i * 12;
    (
        TagSignature(read_u32(bytes, at)),
        read_u32(bytes, at + 4) as usize,
        read_u32(bytes, at + 8) as usize,
    )
}

fn entry_index(bytes: &[u8], sig: TagSignature) -> usize {
    let count = read_u32(bytes, 128) as usize;
    (0..count)
        .find(|&i| entry(bytes, i).0 == sig)
        .expect("tag present")
}

fn parse_kind(bytes: &[u8]) -> ErrorKind {
    let err = IccProfile::parse(bytes).expect_err("malformed profile accepted");
    oxlut_core::Error::from(err).kind()
}

#[test]
fn test_round_trip_within_one_code_value() {
    for (seed, size) in [(1u64, 2usize), (2, 5), (3, 17)] {
        let grid = generate_grid(GridPattern::Random(seed), size);
        let back = decode(&encode(&grid));
        let stats = compare_grids(&grid, &back).unwrap();
        assert!(stats.is_exact_u16(), "size {}: {:?}", size, stats);
    }
}

#[test]
fn test_reencode_is_byte_identical() {
    let grid = generate_grid(GridPattern::Gamma(2.2), 9);
    let bytes = encode(&grid);
    let again = IccProfile::parse(&bytes).unwrap().encode().unwrap();
    assert_eq!(bytes, again);
}

#[test]
fn test_clut_in_raster_order() {
    let grid = generate_grid(GridPattern::ChannelSwap, 4);
    let profile = IccProfile::parse(&encode(&grid)).unwrap();
    let lut = profile.a2b0().unwrap();

    assert_eq!((lut.input_channels, lut.output_channels, lut.grid_points), (3, 3, 4));
    for (index, sample) in grid.samples().iter().enumerate() {
        for c in 0..3 {
            let expected = (sample[c] * 65535.0).round() as u16;
            assert_eq!(lut.clut[index * 3 + c], expected, "index {} channel {}", index, c);
        }
    }
    // R varies fastest: entry 1 is (r=1, g=0, b=0), swapped to (b, r, g)
    assert_eq!(&lut.clut[3..6], &[0, 21845, 0]);
}

#[test]
fn test_header_and_alignment() {
    let bytes = encode(&ColorGrid::identity(3).unwrap());
    assert_eq!(read_u32(&bytes, 0) as usize, bytes.len());
    assert_eq!(&bytes[36..40], b"acsp");
    assert_eq!(&bytes[12..16], b"link");
    assert_eq!(&bytes[16..20], b"RGB ");
    assert_eq!(&bytes[20..24], b"RGB ");
    assert_eq!(bytes.len() % 4, 0);

    let count = read_u32(&bytes, 128) as usize;
    assert_eq!(count, 4);
    for i in 0..count {
        let (_, offset, size) = entry(&bytes, i);
        assert_eq!(offset % 4, 0);
        assert!(offset >= TABLE_START + count * 12);
        assert!(offset + size <= bytes.len());
    }
}

#[test]
fn test_identical_payloads_share_offset() {
    let mut profile = IccProfile::new(IccHeader::device_link(
        RenderingIntent::Perceptual,
        fixed_date(),
    ));
    let target = TagSignature::from_bytes(*b"targ");
    profile.set_tag(TagSignature::COPYRIGHT, TagData::Text(TextData::new("Shared")));
    profile.set_tag(target, TagData::Text(TextData::new("Shared")));
    profile.set_tag(
        TagSignature::DESC,
        TagData::Description(TextData::new("Distinct")),
    );

    let bytes = profile.encode().unwrap();
    let (_, cprt_offset, cprt_size) = entry(&bytes, 0);
    let (_, targ_offset, targ_size) = entry(&bytes, 1);
    let (_, desc_offset, _) = entry(&bytes, 2);
    assert_eq!(cprt_offset, targ_offset);
    assert_eq!(cprt_size, targ_size);
    assert_ne!(desc_offset, cprt_offset);

    let back = IccProfile::parse(&bytes).unwrap();
    assert_eq!(back.get_tag(target), back.get_tag(TagSignature::COPYRIGHT));
    assert_eq!(back.copyright().as_deref(), Some("Shared"));
}

#[test]
fn test_unknown_tag_kept_verbatim() {
    let mut profile = IccProfile::new(IccHeader::device_link(
        RenderingIntent::Saturation,
        fixed_date(),
    ));
    let mut data = b"zzzz\0\0\0\0".to_vec();
    data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7]);
    let raw = TagData::Raw {
        type_sig: u32::from_be_bytes(*b"zzzz"),
        data,
    };
    let sig = TagSignature::from_bytes(*b"priv");
    profile.set_tag(sig, raw.clone());

    let bytes = profile.encode().unwrap();
    let back = IccProfile::parse(&bytes).unwrap();
    assert_eq!(back.get_tag(sig), Some(&raw));
    assert_eq!(back.encode().unwrap(), bytes);
}

#[test]
fn test_rejects_bad_signature_and_size() {
    let good = encode(&ColorGrid::identity(2).unwrap());

    let mut bad = good.clone();
    bad[36] = b'x';
    assert_eq!(parse_kind(&bad), ErrorKind::Format);

    let mut bad = good.clone();
    bad.extend_from_slice(&[0; 4]);
    assert_eq!(parse_kind(&bad), ErrorKind::Format);

    assert_eq!(parse_kind(&good[..100]), ErrorKind::Format);
    assert_eq!(parse_kind(&good[..good.len() - 4]), ErrorKind::Format);
}

#[test]
fn test_rejects_out_of_range_tag() {
    let good = encode(&ColorGrid::identity(2).unwrap());
    let i = entry_index(&good, TagSignature::PROFILE_SEQUENCE);

    let mut bad = good.clone();
    write_u32(&mut bad, TABLE_START + i * 12 + 4, good.len() as u32);
    assert_eq!(parse_kind(&bad), ErrorKind::Format);

    // Pointing into the header
    let mut bad = good.clone();
    write_u32(&mut bad, TABLE_START + i * 12 + 4, 64);
    assert_eq!(parse_kind(&bad), ErrorKind::Format);
}

#[test]
fn test_rejects_overlapping_tags() {
    let good = encode(&ColorGrid::identity(2).unwrap());
    let lut = entry_index(&good, TagSignature::A2B0);
    let pseq = entry_index(&good, TagSignature::PROFILE_SEQUENCE);
    let (_, lut_offset, _) = entry(&good, lut);

    let mut bad = good.clone();
    write_u32(&mut bad, TABLE_START + pseq * 12 + 4, (lut_offset + 8) as u32);
    assert_eq!(parse_kind(&bad), ErrorKind::Format);
}

#[test]
fn test_rejects_mis_sized_lut_tag() {
    let good = encode(&ColorGrid::identity(2).unwrap());
    let lut = entry_index(&good, TagSignature::A2B0);
    let (_, _, size) = entry(&good, lut);

    let mut bad = good.clone();
    write_u32(&mut bad, TABLE_START + lut * 12 + 8, (size - 2) as u32);
    assert_eq!(parse_kind(&bad), ErrorKind::Format);
}

#[test]
fn test_rejects_wrong_tag_type() {
    let good = encode(&ColorGrid::identity(2).unwrap());
    let (_, offset, _) = entry(&good, entry_index(&good, TagSignature::A2B0));

    let mut bad = good.clone();
    bad[offset..offset + 4].copy_from_slice(b"mft1");
    assert_eq!(parse_kind(&bad), ErrorKind::Format);
}
