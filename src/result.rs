//! Error types and the related `Result<T>`

use thiserror::Error;

pub type BgzfResult<T> = Result<T, BgzfError>;

#[derive(Debug, Error)]
pub enum BgzfError {
    /// An error from underlying I/O
    #[error("I/O Error")]
    Io(#[from] std::io::Error),

    /// The stream contained data that isn't valid BGZF.
    #[error("Malformed BGZF data: {0}")]
    Malformed(&'static str),

    /// The DEFLATE payload of a block couldn't be decoded.
    #[error("Malformed BGZF data: invalid deflate stream")]
    Inflate(#[source] flate2::DecompressError),

    /// A decompressed block didn't match the CRC32 stored in its trailer.
    /// (Only reported when checksum verification is turned on.)
    #[error("Malformed BGZF data: CRC32 {actual:#010x} doesn't match stored {expected:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// A seek target fell outside `[0, length]` of the uncompressed data.
    #[error("Position {position} out of range (uncompressed length is {length})")]
    OutOfRange { position: u64, length: u64 },

    /// The caller asked to fill a window that doesn't fit in its buffer.
    #[error("Window of {len} bytes at offset {offset} exceeds buffer of {buffer_len} bytes")]
    BufferBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// A cast from a 64-bit int to a usize failed,
    /// probably on a 32-bit system.
    #[error("BGZF stream too large for address space")]
    InsufficientAddressSpace,
}

impl BgzfError {
    /// Returns true for errors caused by malformed input,
    /// which will fail the same way every time they're retried.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            BgzfError::Malformed(_) | BgzfError::Inflate(_) | BgzfError::ChecksumMismatch { .. }
        )
    }
}

impl From<BgzfError> for std::io::Error {
    fn from(e: BgzfError) -> Self {
        use std::io::ErrorKind;
        match e {
            BgzfError::Io(inner) => inner,
            e if e.is_format_error() => std::io::Error::new(ErrorKind::InvalidData, e),
            e => std::io::Error::new(ErrorKind::InvalidInput, e),
        }
    }
}

/// Converts an I/O error from a fixed-size read into the appropriate
/// BGZF error: running out of bytes means the stream is truncated.
pub(crate) fn short_read(e: std::io::Error, what: &'static str) -> BgzfError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        BgzfError::Malformed(what)
    } else {
        BgzfError::Io(e)
    }
}
