//! crates/checksums/src/crc32.rs
//!
//! CRC-32/ISO-HDLC block checksum.
//!
//! This is the same polynomial (`0x04C11DB7`, reflected, init and xor-out
//! `0xFFFFFFFF`) used by zlib, PKZIP and Ethernet. Signature files written
//! with this algorithm are interchangeable with any other producer that uses
//! the standard CRC-32, provided both sides agree on the block size.

use crate::block::BlockChecksum;

/// Stateless CRC-32 block checksum.
///
/// # Examples
///
/// ```
/// use checksums::Crc32;
///
/// assert_eq!(Crc32::digest(b"123456789"), 0xCBF4_3926);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Crc32;

impl Crc32 {
    /// Width of a CRC-32 value in bytes.
    pub const DIGEST_LEN: usize = 4;

    /// Computes the CRC-32 of `data` in one shot.
    #[inline]
    #[must_use]
    pub fn digest(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

impl BlockChecksum for Crc32 {
    #[inline]
    fn checksum(&self, bytes: &[u8]) -> u32 {
        Self::digest(bytes)
    }

    fn name(&self) -> &'static str {
        "crc32"
    }
}

/// Streaming CRC-32 hasher.
///
/// The signature engine maps every block whole and uses [`Crc32::digest`].
/// This hasher is for callers that receive a block in pieces, such as a
/// buffered reader; its result equals the one-shot digest of the
/// concatenated input.
///
/// # Examples
///
/// ```
/// use checksums::{Crc32, Crc32Hasher};
///
/// let mut hasher = Crc32Hasher::new();
/// hasher.update(b"1234");
/// hasher.update(b"56789");
/// assert_eq!(hasher.finalize(), Crc32::digest(b"123456789"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Crc32Hasher {
    inner: crc32fast::Hasher,
    len: u64,
}

impl Crc32Hasher {
    /// Creates a hasher with the standard initial state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds additional bytes into the checksum state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.len = self.len.saturating_add(data.len() as u64);
    }

    /// Number of bytes observed so far.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` when no bytes have been fed yet.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the hasher and returns the final checksum.
    #[must_use]
    pub fn finalize(self) -> u32 {
        self.inner.finalize()
    }
}
