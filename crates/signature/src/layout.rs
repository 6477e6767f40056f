//! crates/signature/src/layout.rs
//!
//! Block and window partitioning arithmetic.
//!
//! A source of `S` bytes split into blocks of `B` bytes has `ceil(S / B)`
//! blocks; every block is `B` bytes long except possibly the last one, which
//! holds the remainder. The signature file stores one [`CHECKSUM_WIDTH`]-byte
//! slot per block. It is written in windows of at most one page each, so a
//! window covers `page / 4` consecutive blocks.

use std::iter::FusedIterator;
use std::num::NonZeroU64;

use thiserror::Error;

/// Width in bytes of one checksum slot in the signature file.
pub const CHECKSUM_WIDTH: u64 = 4;

/// Errors produced when partitioning a source file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum LayoutError {
    /// The signature would be larger than a 64-bit length can express.
    #[error("{block_count} checksum slots exceed the maximum signature length")]
    SignatureTooLarge {
        /// Number of blocks derived from the source length.
        block_count: u64,
    },
}

/// Byte range of one source block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct BlockRange {
    /// Offset of the first byte of the block in the source.
    pub offset: u64,
    /// Number of bytes in the block. Never zero.
    pub len: u64,
}

/// Describes how a source file is split into blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureLayout {
    source_len: u64,
    block_size: NonZeroU64,
    block_count: u64,
}

impl SignatureLayout {
    /// Partitions a source of `source_len` bytes into `block_size` blocks.
    pub fn new(source_len: u64, block_size: NonZeroU64) -> Result<Self, LayoutError> {
        let block_count = source_len.div_ceil(block_size.get());
        if block_count.checked_mul(CHECKSUM_WIDTH).is_none() {
            return Err(LayoutError::SignatureTooLarge { block_count });
        }

        Ok(Self {
            source_len,
            block_size,
            block_count,
        })
    }

    /// Length of the source in bytes.
    #[inline]
    #[must_use]
    pub const fn source_len(&self) -> u64 {
        self.source_len
    }

    /// Nominal block size in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> NonZeroU64 {
        self.block_size
    }

    /// Number of blocks, `ceil(source_len / block_size)`.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Length of the trailing partial block, or zero when the last block is full.
    #[inline]
    #[must_use]
    pub const fn remainder(&self) -> u64 {
        self.source_len % self.block_size.get()
    }

    /// Exact size in bytes of the signature file.
    #[inline]
    #[must_use]
    pub const fn signature_len(&self) -> u64 {
        self.block_count * CHECKSUM_WIDTH
    }

    /// Source byte range of block `index`, truncated at the end of the source.
    #[must_use]
    pub fn block_range(&self, index: u64) -> Option<BlockRange> {
        if index >= self.block_count {
            return None;
        }
        let offset = index * self.block_size.get();
        let len = self.block_size.get().min(self.source_len - offset);
        Some(BlockRange { offset, len })
    }

    /// Iterates the output windows for a page of `page_size` bytes.
    ///
    /// `page_size` is rounded down to a whole number of slots (at least one).
    #[must_use]
    pub fn windows(&self, page_size: usize) -> Windows {
        let page = (page_size as u64 / CHECKSUM_WIDTH).max(1) * CHECKSUM_WIDTH;
        Windows {
            page,
            block_count: self.block_count,
            processed: 0,
            index: 0,
        }
    }
}

/// One page-bounded range of the signature file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Window {
    /// Zero-based window number.
    pub index: u64,
    /// Byte offset of the window in the signature file.
    pub offset: u64,
    /// Window length in bytes; always a multiple of [`CHECKSUM_WIDTH`].
    pub len: usize,
    /// Block whose checksum lands in the first slot.
    pub first_block: u64,
    /// Number of slots in the window.
    pub slots: u64,
}

/// Iterator over the windows of a [`SignatureLayout`].
#[derive(Clone, Debug)]
pub struct Windows {
    page: u64,
    block_count: u64,
    processed: u64,
    index: u64,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        if self.processed >= self.block_count {
            return None;
        }

        let remaining = (self.block_count - self.processed) * CHECKSUM_WIDTH;
        let len = self.page.min(remaining);
        let window = Window {
            index: self.index,
            offset: self.processed * CHECKSUM_WIDTH,
            len: len as usize,
            first_block: self.processed,
            slots: len / CHECKSUM_WIDTH,
        };

        self.processed += window.slots;
        self.index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let slots_per_page = self.page / CHECKSUM_WIDTH;
        let remaining = (self.block_count - self.processed).div_ceil(slots_per_page);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl FusedIterator for Windows {}
