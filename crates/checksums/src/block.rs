//! crates/checksums/src/block.rs
//!
//! The checksum capability consumed by the signature engine.

/// Computes a 32-bit fingerprint of a single block.
///
/// Implementations must be pure: the same bytes always produce the same
/// value, regardless of which worker thread performs the computation. The
/// trait is object-safe so callers may pass `&dyn BlockChecksum` when the
/// algorithm is chosen at runtime.
///
/// # Examples
///
/// ```
/// use checksums::{BlockChecksum, Crc32};
///
/// fn fingerprint(algorithm: &dyn BlockChecksum, block: &[u8]) -> u32 {
///     algorithm.checksum(block)
/// }
///
/// assert_eq!(fingerprint(&Crc32, b""), 0);
/// ```
pub trait BlockChecksum: Send + Sync {
    /// Returns the checksum of `bytes`.
    fn checksum(&self, bytes: &[u8]) -> u32;

    /// Short human-readable algorithm name used in diagnostics.
    fn name(&self) -> &'static str;
}

impl<T: BlockChecksum + ?Sized> BlockChecksum for &T {
    #[inline]
    fn checksum(&self, bytes: &[u8]) -> u32 {
        (**self).checksum(bytes)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
