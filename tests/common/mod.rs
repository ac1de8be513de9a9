//! Fixture builders shared by the integration tests.
//!
//! The member writer is the one the unit tests use.

#![allow(dead_code)]

use std::io::Read;

use flate2::read::MultiGzDecoder;

#[path = "../../src/testing.rs"]
mod testing;
pub use testing::*;

pub const FOX: &[u8] = b"The quick brown fox jumps over the lazy dog\n";

/// Decompresses a whole stream with an ordinary gzip decoder.
pub fn gunzip(stream: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    MultiGzDecoder::new(stream).read_to_end(&mut out).unwrap();
    out
}

/// Some compressible, non-repeating text
pub fn corpus(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut state = 0x2545_f491_4f6c_dd1du64;
    while out.len() < len {
        // xorshift
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let word = ["ACGT", "GATTACA", "TTAGGG", "\n", "CCAAT", "TATA"][(state % 6) as usize];
        out.extend_from_slice(word.as_bytes());
    }
    out.truncate(len);
    out
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
