//! A reusable raw DEFLATE engine for decompressing one block at a time

use flate2::{Decompress, FlushDecompress};
use log::*;

use crate::arch::usize;
use crate::result::*;

/// Owns a raw-inflate state that is reset after every block,
/// so it's allocated once per reader instead of once per read.
///
/// The state (and the memory backing it) is freed when this is dropped.
pub struct Inflater {
    state: Decompress,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            // No zlib header: BGZF payloads are raw DEFLATE.
            state: Decompress::new(false),
        }
    }

    /// Decompresses `input`, which must expand to exactly `expected` bytes.
    ///
    /// The engine is reset afterwards whether or not this succeeds.
    pub fn inflate_block(&mut self, input: &[u8], expected: u32) -> BgzfResult<Vec<u8>> {
        let result = self.inflate(input, expected);
        self.state.reset(false);
        result
    }

    fn inflate(&mut self, input: &[u8], expected: u32) -> BgzfResult<Vec<u8>> {
        let expected = usize(expected)?;
        // One spare byte, so a block expanding past its ISIZE is noticed.
        let mut output = Vec::with_capacity(expected + 1);
        let status = self
            .state
            .decompress_vec(input, &mut output, FlushDecompress::Finish)
            .map_err(BgzfError::Inflate)?;
        trace!(
            "Inflated {} bytes into {} ({:?})",
            self.state.total_in(),
            output.len(),
            status
        );

        if output.is_empty() {
            return Err(BgzfError::Malformed("block data incomplete to decompress"));
        }
        if output.len() != expected {
            return Err(BgzfError::Malformed("block not fully decompressed"));
        }
        Ok(output)
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}
