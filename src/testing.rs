//! Writes BGZF streams for tests.
//!
//! The library only reads BGZF, so we write our own members here,
//! laid out the same way `bgzip` does. The integration tests pull this
//! same file in through `tests/common`, so there's only one writer.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

/// The canonical 28-byte end-of-stream member
pub const EOF_MARKER: [u8; 28] = [
    0x1f, 0x8b, 8, 4, 0, 0, 0, 0, 0, 0xff, 6, 0, b'B', b'C', 2, 0, 27, 0, 3, 0, 0, 0, 0, 0, 0, 0,
    0, 0,
];

/// Compresses `data` into one BGZF member,
/// with any `extra_subfields` placed before the BSIZE subfield.
pub fn member_with_extra(data: &[u8], extra_subfields: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    let payload = encoder.finish().unwrap();

    let xlen = extra_subfields.len() + 6;
    let member_size = 12 + xlen + payload.len() + 8;

    let mut member = vec![0x1f, 0x8b, 8, 4, 0, 0, 0, 0, 0, 0xff];
    member.extend_from_slice(&(xlen as u16).to_le_bytes());
    member.extend_from_slice(extra_subfields);
    member.extend_from_slice(&[b'B', b'C', 2, 0]);
    member.extend_from_slice(&((member_size - 1) as u16).to_le_bytes());
    member.extend_from_slice(&payload);
    member.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    member.extend_from_slice(&(data.len() as u32).to_le_bytes());
    assert_eq!(member.len(), member_size);
    member
}

pub fn member(data: &[u8]) -> Vec<u8> {
    member_with_extra(data, &[])
}

/// Compresses `data` into members of the given sizes (cycling through them),
/// followed by the EOF marker.
pub fn bgzf_sized(data: &[u8], sizes: &[usize]) -> Vec<u8> {
    let mut stream = Vec::new();
    let mut rest = data;
    for size in sizes.iter().cycle() {
        if rest.is_empty() {
            break;
        }
        let (piece, tail) = rest.split_at((*size).clamp(1, rest.len()));
        stream.extend_from_slice(&member(piece));
        rest = tail;
    }
    stream.extend_from_slice(&EOF_MARKER);
    stream
}

/// Compresses `data` into members of `chunk` bytes, plus the EOF marker.
pub fn bgzf(data: &[u8], chunk: usize) -> Vec<u8> {
    bgzf_sized(data, &[chunk])
}
