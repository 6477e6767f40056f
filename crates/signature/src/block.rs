//! crates/signature/src/block.rs
//!
//! Per-block work: checksum one source range into one output slot.

use checksums::BlockChecksum;
use fast_io::mmap::{MappedFile, SlotError, SlotWriter};
#[cfg(feature = "tracing")]
use tracing::trace;

use crate::error::SignatureError;
use crate::layout::BlockRange;

/// Checksums the source bytes described by `range` and stores the result in
/// slot `slot` of `window`.
///
/// Only `range` is mapped, never the whole source, so the resident set per
/// in-flight block is bounded by the block size. An out-of-window `slot` is a
/// partitioning defect and yields [`SignatureError::ConcurrencyFault`] before
/// any source byte is touched.
///
/// # Examples
///
/// ```no_run
/// use checksums::Crc32;
/// use fast_io::mmap::MappedFile;
/// use signature::{BlockRange, process_block};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = MappedFile::open_read("data.bin")?;
/// let output = MappedFile::open_read_write("data.sig")?;
/// let mut window = output.map_region_mut(0, 4)?;
/// let slots = window.slots()?;
/// process_block(&source, BlockRange { offset: 0, len: 512 }, &slots, 0, &Crc32)?;
/// # Ok(())
/// # }
/// ```
pub fn process_block<C>(
    source: &MappedFile,
    range: BlockRange,
    window: &SlotWriter<'_>,
    slot: u64,
    checksum: &C,
) -> Result<(), SignatureError>
where
    C: BlockChecksum + ?Sized,
{
    if !usize::try_from(slot).is_ok_and(|slot| slot < window.len()) {
        return Err(SignatureError::ConcurrencyFault(SlotError::OutOfRange {
            index: slot,
            slots: window.len(),
        }));
    }

    let len = usize::try_from(range.len)
        .map_err(|_| SignatureError::BlockTooLarge { block_size: range.len })?;
    let bytes = source
        .map_region(range.offset, len)
        .map_err(|error| SignatureError::io("map source block of", source.path(), error))?;

    let value = checksum.checksum(&bytes);
    #[cfg(feature = "tracing")]
    trace!(offset = range.offset, len, slot, value, "block checksummed");

    window.write(slot, value).map_err(SignatureError::ConcurrencyFault)
}
