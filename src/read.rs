//! Tools for reading a BGZF stream at arbitrary uncompressed offsets.
//!
//! To start reading, create a [`BgzfReader`] from any seekable byte source.
//!
//! [`BgzfReader`]: struct.BgzfReader.html

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use log::*;

use crate::arch::usize;
use crate::index::{BlockDescriptor, BlockIndex};
use crate::inflate::Inflater;
use crate::result::*;

/// Returned by [`BgzfReader::read()`] when the cursor is already at
/// (or past) the end of the uncompressed data.
///
/// [`BgzfReader::read()`]: struct.BgzfReader.html#method.read
pub const END_OF_INPUT: isize = -1;

/// A decompressed block kept around for the next read
///
/// Cloning shares the data, so one block can fill both cache slots.
#[derive(Debug, Clone)]
struct CachedBlock {
    start: u64,
    data: Arc<Vec<u8>>,
}

impl CachedBlock {
    /// Returns the bytes from `pos` to the end of the block,
    /// if the block contains `pos`.
    fn tail_from(&self, pos: u64) -> Option<&[u8]> {
        let skip = pos.checked_sub(self.start)?;
        if skip >= self.data.len() as u64 {
            return None;
        }
        Some(&self.data[skip as usize..])
    }
}

/// Random-access reader over the uncompressed contents of a BGZF stream
///
/// Construction indexes the stream once; afterwards each read only
/// decompresses the blocks overlapping the requested range.
/// The first and last blocks touched by each read are cached,
/// so sequential reads don't decompress the same boundary block twice.
///
/// ```no_run
/// # use bgzf_seek::*;
/// let mut reader = BgzfReader::open("reads.fastq.gz")?;
/// reader.seek(1 << 20)?;
/// let mut buf = [0u8; 4096];
/// let copied = reader.read(&mut buf, 0, 4096)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// A reader isn't meant to be shared between threads.
/// Instead, give each thread its own handle and reader,
/// reusing one [`BlockIndex`] so the stream is only parsed once:
///
/// ```no_run
/// # use std::fs::File;
/// # use bgzf_seek::*;
/// let first = BgzfReader::new(File::open("data.bgz")?)?;
/// let second = BgzfReader::with_index(File::open("data.bgz")?, first.index().clone());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// Note that the inherent [`read()`] and [`seek()`] shadow the methods of the
/// same name on [`io::Read`] and [`io::Seek`], which this also implements.
///
/// [`BlockIndex`]: ../index/struct.BlockIndex.html
/// [`read()`]: #method.read
/// [`seek()`]: #method.seek
/// [`io::Read`]: https://doc.rust-lang.org/std/io/trait.Read.html
/// [`io::Seek`]: https://doc.rust-lang.org/std/io/trait.Seek.html
pub struct BgzfReader<R> {
    inner: R,
    /// True if we opened `inner` ourselves, and so should close it.
    owns_inner: bool,
    index: Arc<BlockIndex>,
    inflater: Inflater,
    /// Scratch space for compressed payloads
    compressed: Vec<u8>,
    position: u64,
    /// The block touching the start of the last read window
    preceding: Option<CachedBlock>,
    /// The block touching the end of the last read window
    following: Option<CachedBlock>,
    cache_enabled: bool,
    cache_hits: u64,
    verify_checksums: bool,
}

impl BgzfReader<BufReader<File>> {
    /// Opens and indexes the BGZF file at the given path.
    ///
    /// The reader owns the file, and closes it on [`close()`](#method.close).
    pub fn open<P: AsRef<Path>>(path: P) -> BgzfResult<Self> {
        let path = path.as_ref();
        info!("Opening {}", path.display());
        let mut file = BufReader::new(File::open(path)?);
        let index = BlockIndex::build(&mut file)?;
        Ok(Self::from_parts(file, Arc::new(index), true))
    }
}

impl<R: Read + Seek> BgzfReader<R> {
    /// Indexes the BGZF stream starting at the current position of `inner`.
    ///
    /// The handle stays the caller's: [`close()`](#method.close) gives it back.
    /// (To keep using a `File` elsewhere, pass `&File` or `&mut File`.)
    pub fn new(mut inner: R) -> BgzfResult<Self> {
        let index = BlockIndex::build(&mut inner)?;
        Ok(Self::from_parts(inner, Arc::new(index), false))
    }

    /// Creates a reader from an index built earlier for the same stream,
    /// skipping the indexing pass.
    pub fn with_index(inner: R, index: Arc<BlockIndex>) -> Self {
        Self::from_parts(inner, index, false)
    }

    fn from_parts(inner: R, index: Arc<BlockIndex>, owns_inner: bool) -> Self {
        Self {
            inner,
            owns_inner,
            index,
            inflater: Inflater::new(),
            compressed: Vec::new(),
            position: 0,
            preceding: None,
            following: None,
            cache_enabled: true,
            cache_hits: 0,
            verify_checksums: false,
        }
    }

    /// Checks each decompressed block against the CRC-32 in its trailer.
    /// Off by default.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Enables or disables caching the boundary blocks of each read.
    /// On by default.
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        if !enabled {
            self.preceding = None;
            self.following = None;
        }
        self
    }

    /// The index of the stream, for sharing with other readers
    pub fn index(&self) -> &Arc<BlockIndex> {
        &self.index
    }

    /// Total length of the uncompressed data
    pub fn length(&self) -> u64 {
        self.index.total_length()
    }

    /// Current position in the uncompressed data
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of bytes served from cached blocks so far
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    /// Moves the cursor to `pos` in the uncompressed data.
    ///
    /// `pos` may be anywhere in `[0, length()]`;
    /// anything else is an error and leaves the cursor where it was.
    pub fn seek(&mut self, pos: u64) -> BgzfResult<()> {
        if pos > self.length() {
            return Err(BgzfError::OutOfRange {
                position: pos,
                length: self.length(),
            });
        }
        self.position = pos;
        Ok(())
    }

    /// Advances the cursor by up to `n` bytes, stopping at the end of the data.
    /// Returns how far it actually moved (zero if `n` isn't positive).
    pub fn skip(&mut self, n: i64) -> u64 {
        if n <= 0 {
            return 0;
        }
        let advance = (n as u64).min(self.length() - self.position);
        self.position += advance;
        advance
    }

    /// Reads up to `max_len` bytes of uncompressed data into `buf[off..]`.
    ///
    /// Returns the number of bytes copied, which is only less than `max_len`
    /// if the data ran out first, or [`END_OF_INPUT`] if the cursor
    /// was already at the end.
    ///
    /// If a block turns out to be malformed partway through,
    /// the error is returned even though earlier bytes of `buf` were filled.
    ///
    /// [`END_OF_INPUT`]: constant.END_OF_INPUT.html
    pub fn read(&mut self, buf: &mut [u8], off: usize, max_len: usize) -> BgzfResult<isize> {
        let end = off
            .checked_add(max_len)
            .filter(|end| *end <= buf.len())
            .ok_or(BgzfError::BufferBounds {
                offset: off,
                len: max_len,
                buffer_len: buf.len(),
            })?;
        let window = &mut buf[off..end];

        if window.is_empty() {
            return Ok(0);
        }
        if self.position >= self.length() {
            return Ok(END_OF_INPUT);
        }

        let mut copied = 0;
        if self.cache_enabled {
            copied += self.copy_from_cache(window);
        }
        if copied < window.len() && self.position < self.length() {
            copied += self.copy_from_blocks(&mut window[copied..])?;
        }
        Ok(copied as isize)
    }

    /// Copies whatever the cached blocks hold at the cursor into `window`.
    fn copy_from_cache(&mut self, window: &mut [u8]) -> usize {
        let mut pos = self.position;
        let mut copied = 0;

        for cached in [self.preceding.as_ref(), self.following.as_ref()]
            .into_iter()
            .flatten()
        {
            if copied == window.len() {
                break;
            }
            if let Some(available) = cached.tail_from(pos) {
                let n = available.len().min(window.len() - copied);
                window[copied..copied + n].copy_from_slice(&available[..n]);
                copied += n;
                pos += n as u64;
            }
        }

        if copied > 0 {
            debug!("Served {} bytes at {} from cache", copied, self.position);
        }
        self.position = pos;
        self.cache_hits += copied as u64;
        copied
    }

    /// Decompresses the blocks covering `window` at the cursor and copies them in.
    fn copy_from_blocks(&mut self, window: &mut [u8]) -> BgzfResult<usize> {
        let index = Arc::clone(&self.index);
        let blocks = index.covering(self.position, window.len() as u64);
        let last = blocks.len().saturating_sub(1);
        let mut copied = 0;

        for (i, (start, descriptor)) in blocks.iter().enumerate() {
            let data = self.load_block(descriptor)?;

            // Trim the front if the block starts before the cursor,
            // and the back if it runs past the window.
            let skip = usize(self.position - start)?;
            let n = (data.len() - skip).min(window.len() - copied);
            window[copied..copied + n].copy_from_slice(&data[skip..skip + n]);
            copied += n;
            self.position += n as u64;

            if self.cache_enabled && (i == 0 || i == last) {
                let cached = CachedBlock {
                    start: *start,
                    data: Arc::new(data),
                };
                if i == 0 {
                    self.preceding = Some(cached.clone());
                }
                if i == last {
                    self.following = Some(cached);
                }
            }

            if copied == window.len() {
                break;
            }
        }
        Ok(copied)
    }

    /// Reads and decompresses a single block.
    fn load_block(&mut self, block: &BlockDescriptor) -> BgzfResult<Vec<u8>> {
        trace!("Loading {:?}", block);
        self.inner.seek(SeekFrom::Start(block.data_offset))?;
        self.compressed.resize(usize(block.compressed_length)?, 0);
        self.inner
            .read_exact(&mut self.compressed)
            .map_err(|e| short_read(e, "block data incomplete to read"))?;

        let data = self
            .inflater
            .inflate_block(&self.compressed, block.uncompressed_length)?;

        if self.verify_checksums {
            let actual = crc32fast::hash(&data);
            if actual != block.crc32 {
                return Err(BgzfError::ChecksumMismatch {
                    expected: block.crc32,
                    actual,
                });
            }
        }
        Ok(data)
    }

    /// Finishes with the reader, releasing its decompressor.
    ///
    /// If the reader opened the underlying file itself, it's closed
    /// and `None` is returned. Otherwise the handle is given back.
    pub fn close(self) -> Option<R> {
        let Self {
            inner, owns_inner, ..
        } = self;
        if owns_inner {
            debug!("Closing underlying file");
            drop(inner);
            None
        } else {
            Some(inner)
        }
    }

    /// Unwraps the underlying handle, regardless of who opened it.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Read for BgzfReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        match BgzfReader::read(self, buf, 0, len)? {
            END_OF_INPUT => Ok(0),
            n => Ok(n as usize),
        }
    }
}

impl<R: Read + Seek> Seek for BgzfReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.length().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        }
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the uncompressed data",
            )
        })?;
        BgzfReader::seek(self, target)?;
        Ok(target)
    }
}
