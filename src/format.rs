//! Code specific to the BGZF wire format.
//!
//! We try to keep the nitty gritty here,
//! and higher-level stuff in the [`index`] and [`read`] modules.
//!
//! Layout comments quote [RFC 1952] (gzip) and section 4.1 of the
//! [SAM/BAM specification], which defines BGZF.
//!
//! [`index`]: ../index/index.html
//! [`read`]: ../read/index.html
//! [RFC 1952]: https://www.rfc-editor.org/rfc/rfc1952
//! [SAM/BAM specification]: https://samtools.github.io/hts-specs/SAMv1.pdf

use std::convert::TryInto;
use std::io::Read;

use log::*;

use crate::result::*;

/// ID1, ID2, CM (deflate), and FLG with only FEXTRA set.
pub const MEMBER_MAGIC: [u8; 4] = [0x1f, 0x8b, 8, 4];

/// SI1 and SI2 of the extra subfield carrying BSIZE
pub const BSIZE_SUBFIELD_ID: [u8; 2] = [b'B', b'C'];

/// Fixed part of a member header, XLEN included
pub const FIXED_HEADER_SIZE: usize = 12;

/// CRC32 + ISIZE
pub const TRAILER_SIZE: usize = 8;

/// Largest uncompressed size a single member may advertise
pub const MAX_BLOCK_INPUT: u32 = 64 * 1024;

// Straight from the Rust docs:

/// Reads a little-endian u32 from the front of the provided slice, shrinking it.
fn read_u32(input: &mut &[u8]) -> u32 {
    let (int_bytes, rest) = input.split_at(std::mem::size_of::<u32>());
    *input = rest;
    u32::from_le_bytes(int_bytes.try_into().expect("less than four bytes for u32"))
}

/// Reads a little-endian u16 from the front of the provided slice, shrinking it.
fn read_u16(input: &mut &[u8]) -> u16 {
    let (int_bytes, rest) = input.split_at(std::mem::size_of::<u16>());
    *input = rest;
    u16::from_le_bytes(int_bytes.try_into().expect("less than two bytes for u16"))
}

/// The header of one BGZF member, up to (but not including) its payload
///
/// MTIME, XFL, and OS mean nothing to BGZF, so they aren't kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberHeader {
    pub extra_length: u16,
    /// Total size of the member, header and trailer included (BSIZE + 1)
    pub member_size: u32,
}

impl MemberHeader {
    /// Reads a member header from the current position of `input`,
    /// leaving it at the start of the compressed payload.
    pub fn read_from<R: Read>(input: &mut R) -> BgzfResult<Self> {
        // +---+---+---+---+---+---+---+---+---+---+---+---+
        // |ID1|ID2|CM |FLG|     MTIME     |XFL|OS | XLEN  |
        // +---+---+---+---+---+---+---+---+---+---+---+---+
        let mut fixed = [0u8; FIXED_HEADER_SIZE];
        input
            .read_exact(&mut fixed)
            .map_err(|e| short_read(e, "truncated member header"))?;

        if fixed[..4] != MEMBER_MAGIC {
            return Err(BgzfError::Malformed("bad member magic"));
        }
        let mut rest = &fixed[10..];
        let extra_length = read_u16(&mut rest);

        // +=================================+
        // |...XLEN bytes of "extra field"...|
        // +=================================+
        let mut extra = vec![0u8; extra_length as usize];
        input
            .read_exact(&mut extra)
            .map_err(|e| short_read(e, "truncated extra field"))?;
        let bsize = find_bsize(&extra)?;

        Ok(Self {
            extra_length,
            member_size: bsize as u32 + 1,
        })
    }

    /// Length of the DEFLATE payload between the header and the trailer.
    pub fn payload_length(&self) -> BgzfResult<u32> {
        // BSIZE + 1 = 12 + XLEN + payload + 8
        (self.member_size as i64 - FIXED_HEADER_SIZE as i64 - self.extra_length as i64
            - TRAILER_SIZE as i64)
            .try_into()
            .map_err(|_| BgzfError::Malformed("negative payload length"))
    }
}

/// Walks the subfields of a gzip extra field and returns the BSIZE
/// stored in the (single) `BC` subfield.
pub fn find_bsize(mut extra: &[u8]) -> BgzfResult<u16> {
    // +---+---+---+---+==================================+
    // |SI1|SI2|  LEN  |... LEN bytes of subfield data ...|
    // +---+---+---+---+==================================+
    let mut bsize = None;

    while !extra.is_empty() {
        if extra.len() < 4 {
            return Err(BgzfError::Malformed("bad extra field"));
        }
        let id = [extra[0], extra[1]];
        extra = &extra[2..];
        let subfield_length = read_u16(&mut extra) as usize;
        if subfield_length > extra.len() {
            return Err(BgzfError::Malformed("bad extra field"));
        }
        let (mut payload, rest) = extra.split_at(subfield_length);
        extra = rest;

        if id == BSIZE_SUBFIELD_ID {
            if subfield_length != 2 {
                return Err(BgzfError::Malformed("bad BSIZE subfield length"));
            }
            if bsize.is_some() {
                return Err(BgzfError::Malformed("duplicate BSIZE subfield"));
            }
            bsize = Some(read_u16(&mut payload));
        } else {
            warn!(
                "Skipping unknown extra subfield {:?} ({} bytes)",
                std::str::from_utf8(&id).unwrap_or("??"),
                subfield_length
            );
        }
    }

    bsize.ok_or(BgzfError::Malformed("no BSIZE subfield; not a BGZF member"))
}

/// The trailer following a member's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberTrailer {
    pub crc32: u32,
    /// Uncompressed size of the member
    pub input_size: u32,
}

impl MemberTrailer {
    pub fn read_from<R: Read>(input: &mut R) -> BgzfResult<Self> {
        //   0   1   2   3   4   5   6   7
        // +---+---+---+---+---+---+---+---+
        // |     CRC32     |     ISIZE     |
        // +---+---+---+---+---+---+---+---+
        let mut trailer = [0u8; TRAILER_SIZE];
        input
            .read_exact(&mut trailer)
            .map_err(|e| short_read(e, "truncated member trailer"))?;
        let mut trailer = &trailer[..];
        let crc32 = read_u32(&mut trailer);
        let input_size = read_u32(&mut trailer);
        if input_size > MAX_BLOCK_INPUT {
            return Err(BgzfError::Malformed("ISIZE exceeds 64 KiB"));
        }
        Ok(Self { crc32, input_size })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn header_bytes(magic: [u8; 4], extra: &[u8]) -> Vec<u8> {
        let mut bytes = magic.to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0xff]);
        bytes.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        bytes.extend_from_slice(extra);
        bytes
    }

    #[test]
    fn parses_canonical_header() {
        let bytes = header_bytes(MEMBER_MAGIC, &[b'B', b'C', 2, 0, 27, 0]);
        let header = MemberHeader::read_from(&mut &bytes[..]).unwrap();
        assert_eq!(
            header,
            MemberHeader {
                extra_length: 6,
                member_size: 28
            }
        );
        // The canonical EOF marker carries a two-byte empty deflate block.
        assert_eq!(header.payload_length().unwrap(), 2);
    }

    #[test]
    fn ignores_reserved_header_bytes() {
        let plain = header_bytes(MEMBER_MAGIC, &[b'B', b'C', 2, 0, 99, 0]);
        let mut stamped = plain.clone();
        stamped[4..10].copy_from_slice(&[0x78, 0x56, 0x34, 0x12, 2, 3]);
        assert_eq!(
            MemberHeader::read_from(&mut &stamped[..]).unwrap(),
            MemberHeader::read_from(&mut &plain[..]).unwrap()
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = header_bytes([0x1f, 0x8b, 8, 0], &[b'B', b'C', 2, 0, 27, 0]);
        assert!(matches!(
            MemberHeader::read_from(&mut &bytes[..]),
            Err(BgzfError::Malformed("bad member magic"))
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = header_bytes(MEMBER_MAGIC, &[b'B', b'C', 2, 0, 27, 0]);
        assert!(matches!(
            MemberHeader::read_from(&mut &bytes[..7]),
            Err(BgzfError::Malformed("truncated member header"))
        ));
        assert!(matches!(
            MemberHeader::read_from(&mut &bytes[..15]),
            Err(BgzfError::Malformed("truncated extra field"))
        ));
    }

    #[test]
    fn skips_unknown_subfields() {
        let extra = [b'X', b'Y', 3, 0, 1, 2, 3, b'B', b'C', 2, 0, 0x34, 0x12];
        assert_eq!(find_bsize(&extra).unwrap(), 0x1234);
    }

    #[test]
    fn rejects_duplicate_or_missing_bsize() {
        let duplicate = [b'B', b'C', 2, 0, 1, 0, b'B', b'C', 2, 0, 1, 0];
        assert!(matches!(
            find_bsize(&duplicate),
            Err(BgzfError::Malformed("duplicate BSIZE subfield"))
        ));

        let missing = [b'X', b'Y', 2, 0, 1, 0];
        assert!(matches!(find_bsize(&missing), Err(BgzfError::Malformed(_))));
        assert!(matches!(find_bsize(&[]), Err(BgzfError::Malformed(_))));
    }

    #[test]
    fn rejects_overrunning_subfields() {
        // Declares 9 bytes of payload with only 2 left.
        let overrun = [b'B', b'C', 9, 0, 1, 0];
        assert!(matches!(
            find_bsize(&overrun),
            Err(BgzfError::Malformed("bad extra field"))
        ));
        // Leftover bytes too short for a subfield preamble.
        let dangling = [b'B', b'C', 2, 0, 1, 0, 7];
        assert!(matches!(
            find_bsize(&dangling),
            Err(BgzfError::Malformed("bad extra field"))
        ));
    }

    #[test]
    fn negative_payload_length_is_malformed() {
        let header = MemberHeader {
            extra_length: 6,
            member_size: 20,
        };
        assert!(matches!(
            header.payload_length(),
            Err(BgzfError::Malformed("negative payload length"))
        ));
    }

    #[test]
    fn reads_trailer() {
        let mut bytes = 0xdeadbeefu32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&45u32.to_le_bytes());
        let trailer = MemberTrailer::read_from(&mut &bytes[..]).unwrap();
        assert_eq!(trailer.crc32, 0xdeadbeef);
        assert_eq!(trailer.input_size, 45);

        let mut oversized = vec![0; 4];
        oversized.extend_from_slice(&(MAX_BLOCK_INPUT + 1).to_le_bytes());
        assert!(MemberTrailer::read_from(&mut &oversized[..]).is_err());
        assert!(matches!(
            MemberTrailer::read_from(&mut &bytes[..5]),
            Err(BgzfError::Malformed("truncated member trailer"))
        ));
    }
}
