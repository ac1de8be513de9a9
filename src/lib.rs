//! bgzf-seek reads the uncompressed contents of a BGZF file
//! at arbitrary offsets, decompressing only the blocks it needs:
//!
//! ```no_run
//! # use bgzf_seek::*;
//! let mut reader = BgzfReader::open("variants.vcf.gz")?;
//! println!("{} bytes uncompressed", reader.length());
//!
//! reader.seek(123_456)?;
//! let mut buf = vec![0u8; 1000];
//! let copied = reader.read(&mut buf, 0, 1000)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! BGZF (the Blocked GNU Zip Format, from the [SAM/BAM specification])
//! is a perfectly ordinary gzip file made of many small gzip members,
//! each holding at most 64 KiB of data. Unlike a normal gzip file,
//! every member states its own compressed size in an extra header field,
//! so we can hop from header to header without decompressing anything.
//! One pass over those headers gives a [`BlockIndex`] mapping uncompressed
//! offsets to members; after that, reading any range means inflating
//! only the handful of members that overlap it.
//!
//! Building the index is the expensive part, so it can be shared.
//! Readers hold mutable state (a cursor, a decompressor, a small cache)
//! and aren't meant to be used from several threads at once,
//! but any number of readers can share one `Arc<BlockIndex>`:
//!
//! ```no_run
//! # use std::fs::File;
//! # use rayon::prelude::*;
//! # use bgzf_seek::*;
//! let index = BgzfReader::open("variants.vcf.gz")?.index().clone();
//!
//! (0..8u64).into_par_iter().try_for_each(|i| -> BgzfResult<()> {
//!     let file = File::open("variants.vcf.gz")?;
//!     let mut reader = BgzfReader::with_index(file, index.clone());
//!     reader.seek(i * reader.length() / 8)?;
//!     let mut buf = [0u8; 512];
//!     reader.read(&mut buf, 0, 512)?;
//!     Ok(())
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [SAM/BAM specification]: https://samtools.github.io/hts-specs/SAMv1.pdf
//! [`BlockIndex`]: index/struct.BlockIndex.html

pub mod index;
pub mod read;
pub mod result;

pub use index::{BlockDescriptor, BlockIndex};
pub use read::{BgzfReader, END_OF_INPUT};
pub use result::{BgzfError, BgzfResult};

mod arch;
mod format;
mod inflate;

#[cfg(test)]
mod testing;
