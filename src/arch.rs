use crate::result::*;

/// A checked cast from u64 to usize
///
/// Uncompressed offsets are tracked as u64,
/// but slicing a decompressed block needs a usize.
pub fn usize<I: Into<u64>>(i: I) -> BgzfResult<usize> {
    let i: u64 = i.into();
    usize::try_from(i).map_err(|_| BgzfError::InsufficientAddressSpace)
}
