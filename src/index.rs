//! The block index: a map from uncompressed offsets to BGZF members
//!
//! BGZF members advertise their own compressed size,
//! so a single pass over the headers (skipping every payload)
//! tells us where each block lives and how much data it holds.

use std::io::{Read, Seek, SeekFrom};

use log::*;

use crate::format;
use crate::result::*;

/// Where one member's compressed payload lives, and what it expands to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Position of the DEFLATE payload in the underlying store
    pub data_offset: u64,

    /// Size of the DEFLATE payload in bytes
    pub compressed_length: u32,

    /// Decompressed size of the block (ISIZE), at most 64 KiB
    pub uncompressed_length: u32,

    /// The CRC-32 of the decompressed block, as stored in its trailer
    pub crc32: u32,
}

/// An ordered, immutable index of the blocks in a BGZF stream.
///
/// Entries are `(start, descriptor)` pairs sorted by their start offset
/// in the uncompressed data, with no gaps or overlaps between them.
/// Build it once, then share it (via `Arc`) between as many readers
/// of the same stream as you'd like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndex {
    entries: Vec<(u64, BlockDescriptor)>,
    total_length: u64,
}

impl BlockIndex {
    /// Indexes a BGZF stream, starting at the current position of `input`,
    /// up to and including its terminal empty member.
    ///
    /// `input` is left just past the terminal member.
    /// Any malformed member fails the whole build.
    pub fn build<R: Read + Seek>(input: &mut R) -> BgzfResult<Self> {
        let mut entries = Vec::new();
        let mut running_offset = 0u64;

        loop {
            let header = format::MemberHeader::read_from(input)?;
            trace!("{:?}", header);
            let compressed_length = header.payload_length()?;

            let data_offset = input.stream_position()?;
            input.seek(SeekFrom::Current(compressed_length as i64))?;
            let trailer = format::MemberTrailer::read_from(input)?;
            trace!("{:?}", trailer);

            if trailer.input_size == 0 {
                trace!("End of stream marker at {}", data_offset);
                break;
            }

            let descriptor = BlockDescriptor {
                data_offset,
                compressed_length,
                uncompressed_length: trailer.input_size,
                crc32: trailer.crc32,
            };
            entries.push((running_offset, descriptor));
            running_offset += trailer.input_size as u64;
        }

        debug!(
            "Indexed {} blocks holding {} uncompressed bytes",
            entries.len(),
            running_offset
        );
        Ok(Self {
            entries,
            total_length: running_offset,
        })
    }

    /// Total length of the uncompressed data
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Number of indexed blocks (not counting the terminal marker)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(start, descriptor)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &(u64, BlockDescriptor)> + '_ {
        self.entries.iter()
    }

    /// Returns the block with the greatest start offset `<= pos`.
    pub fn floor(&self, pos: u64) -> Option<&(u64, BlockDescriptor)> {
        self.floor_index(pos).map(|i| &self.entries[i])
    }

    /// Returns the blocks overlapping `[pos, pos + len)`:
    /// the floor block of `pos`, followed by every block starting inside the window.
    pub fn covering(&self, pos: u64, len: u64) -> &[(u64, BlockDescriptor)] {
        let start = match self.floor_index(pos) {
            Some(i) => i,
            None => return &[],
        };
        let end = pos.saturating_add(len);
        let tail = &self.entries[start + 1..];
        let within = tail.partition_point(|(offset, _)| *offset < end);
        &self.entries[start..start + 1 + within]
    }

    fn floor_index(&self, pos: u64) -> Option<usize> {
        // Number of blocks starting at or before pos
        let count = self.entries.partition_point(|(offset, _)| *offset <= pos);
        count.checked_sub(1)
    }
}
