//! crates/fast_io/src/mmap.rs
//!
//! Memory-mapped views over byte ranges of a file.
//!
//! A [`MappedFile`] is a long-lived handle that remembers the file, its length
//! and the access mode. It does not map anything by itself; callers derive
//! narrow [`MappedRegion`] / [`MappedRegionMut`] views from it, each covering
//! exactly the byte range they need. Views are unmapped when dropped.
//!
//! # Example
//!
//! ```no_run
//! use fast_io::mmap::MappedFile;
//!
//! # fn main() -> std::io::Result<()> {
//! let source = MappedFile::open_read("data.bin")?;
//! let first_block = source.map_region(0, 4096.min(source.len() as usize))?;
//! println!("{} bytes mapped", first_block.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use memmap2::{Mmap, MmapMut, MmapOptions};
use thiserror::Error;

/// Width in bytes of one slot addressed through a [`SlotWriter`].
pub const SLOT_WIDTH: usize = 4;

/// Page size assumed on platforms without a page-size query.
#[cfg(not(unix))]
const FALLBACK_PAGE_SIZE: usize = 4096;

/// Returns the operating system's memory page size in bytes.
#[cfg(unix)]
#[must_use]
pub fn page_size() -> usize {
    rustix::param::page_size()
}

/// Returns the operating system's memory page size in bytes.
#[cfg(not(unix))]
#[must_use]
pub fn page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

/// Returns the length in bytes of the file at `path`.
pub fn file_len(path: impl AsRef<Path>) -> io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Creates or truncates the file at `path` so it is exactly `len` bytes long.
///
/// Newly exposed bytes read as zero.
pub fn resize_file(path: impl AsRef<Path>, len: u64) -> io::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.set_len(len)
}

/// Access mode of a [`MappedFile`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MapMode {
    /// Views are read-only.
    Read,
    /// Views may be read-only or writable.
    ReadWrite,
}

/// Whole-file mapping handle.
///
/// The handle keeps the file open and caches its length at open time. The
/// length is treated as fixed: resize the file before opening the handle.
#[derive(Debug)]
pub struct MappedFile {
    file: File,
    path: PathBuf,
    len: u64,
    mode: MapMode,
}

impl MappedFile {
    /// Opens `path` for read-only mapping.
    pub fn open_read(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_file(file, path, MapMode::Read)
    }

    /// Opens `path` for read-write mapping. The file must already exist.
    pub fn open_read_write(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::from_file(file, path, MapMode::ReadWrite)
    }

    fn from_file(file: File, path: &Path, mode: MapMode) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
            mode,
        })
    }

    /// Returns the file length captured when the handle was opened.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` for a zero-length file.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the access mode the handle was opened with.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> MapMode {
        self.mode
    }

    /// Returns the path the handle was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_range(&self, offset: u64, len: usize) -> io::Result<()> {
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "range {offset}+{len} exceeds {} byte file {}",
                    self.len,
                    self.path.display()
                ),
            )),
        }
    }

    /// Maps `[offset, offset + len)` read-only.
    ///
    /// The offset does not need to be page aligned.
    pub fn map_region(&self, offset: u64, len: usize) -> io::Result<MappedRegion> {
        self.check_range(offset, len)?;
        if len == 0 {
            return Ok(MappedRegion { map: None, offset });
        }

        // SAFETY: The handle was opened by this process and the range was
        // validated against the length captured at open time. The mapping is
        // read-only; concurrent modification by another process is outside the
        // contract of this type, as with any file-backed mapping.
        let map = unsafe { MmapOptions::new().offset(offset).len(len).map(&self.file)? };
        Ok(MappedRegion {
            map: Some(map),
            offset,
        })
    }

    /// Maps `[offset, offset + len)` for reading and writing.
    ///
    /// Fails with [`io::ErrorKind::PermissionDenied`] for read-only handles.
    pub fn map_region_mut(&self, offset: u64, len: usize) -> io::Result<MappedRegionMut> {
        if self.mode != MapMode::ReadWrite {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} was opened read-only", self.path.display()),
            ));
        }
        self.check_range(offset, len)?;
        if len == 0 {
            return Ok(MappedRegionMut { map: None, offset });
        }

        // SAFETY: Same validation as `map_region`. Writable regions handed out
        // by callers of this crate never overlap while alive; the signature
        // driver opens one window at a time.
        let map = unsafe {
            MmapOptions::new()
                .offset(offset)
                .len(len)
                .map_mut(&self.file)?
        };
        Ok(MappedRegionMut {
            map: Some(map),
            offset,
        })
    }
}

/// Read-only view of a byte range of a [`MappedFile`].
pub struct MappedRegion {
    map: Option<Mmap>,
    offset: u64,
}

impl MappedRegion {
    /// Returns the file offset the region starts at.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl Deref for MappedRegion {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegion")
            .field("offset", &self.offset)
            .field("len", &self.len())
            .finish()
    }
}

/// Writable view of a byte range of a [`MappedFile`].
pub struct MappedRegionMut {
    map: Option<MmapMut>,
    offset: u64,
}

impl MappedRegionMut {
    /// Returns the file offset the region starts at.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Writes outstanding modifications back to the file.
    pub fn flush(&self) -> io::Result<()> {
        match &self.map {
            Some(map) => map.flush(),
            None => Ok(()),
        }
    }

    /// Borrows the region as an array of 4-byte slots writable from many
    /// threads at once.
    pub fn slots(&mut self) -> Result<SlotWriter<'_>, SlotError> {
        match &mut self.map {
            Some(map) => SlotWriter::from_bytes(&mut map[..]),
            None => Ok(SlotWriter { slots: &[] }),
        }
    }
}

impl Deref for MappedRegionMut {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for MappedRegionMut {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.map.as_deref_mut().unwrap_or(&mut [])
    }
}

impl fmt::Debug for MappedRegionMut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegionMut")
            .field("offset", &self.offset)
            .field("len", &self.len())
            .finish()
    }
}

/// Errors raised by [`SlotWriter`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum SlotError {
    /// A write addressed a slot past the end of the region.
    #[error("slot {index} is outside a window of {slots} slot(s)")]
    OutOfRange {
        /// Slot that was addressed.
        index: u64,
        /// Number of slots in the region.
        slots: usize,
    },
    /// The byte buffer cannot be viewed as whole, aligned 4-byte slots.
    #[error("{len} byte buffer is not an aligned array of 4-byte slots")]
    Misaligned {
        /// Length of the rejected buffer.
        len: usize,
    },
}

/// Shared writer over disjoint little-endian `u32` slots.
///
/// The writer borrows the underlying bytes mutably for its whole lifetime,
/// so nothing else can observe the buffer while workers store into it. It is
/// `Sync`; each slot is an atomic cell, which keeps concurrent stores to
/// distinct slots free of data races even on weakly ordered platforms.
#[derive(Clone, Copy)]
pub struct SlotWriter<'a> {
    slots: &'a [AtomicU32],
}

impl<'a> SlotWriter<'a> {
    /// Views `bytes` as an array of 4-byte slots.
    ///
    /// The buffer length must be a multiple of [`SLOT_WIDTH`] and its address
    /// must be 4-byte aligned. Memory maps are page aligned, so every region
    /// starting at a multiple of four qualifies.
    pub fn from_bytes(bytes: &'a mut [u8]) -> Result<Self, SlotError> {
        let len = bytes.len();
        if len % SLOT_WIDTH != 0 {
            return Err(SlotError::Misaligned { len });
        }
        if len == 0 {
            return Ok(Self { slots: &[] });
        }
        let ptr = bytes.as_mut_ptr();
        if ptr.align_offset(std::mem::align_of::<AtomicU32>()) != 0 {
            return Err(SlotError::Misaligned { len });
        }

        // SAFETY: `AtomicU32` has the same size as `[u8; 4]`, the pointer is
        // checked to be suitably aligned, and the length is an exact multiple
        // of the slot width. The exclusive borrow of `bytes` is held for `'a`,
        // so the atomics are the only access path while the writer lives.
        let slots =
            unsafe { std::slice::from_raw_parts(ptr.cast::<AtomicU32>(), len / SLOT_WIDTH) };
        Ok(Self { slots })
    }

    /// Number of slots in the region.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when the region holds no slot.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Stores `value` little-endian into slot `index`.
    #[inline]
    pub fn write(&self, index: u64, value: u32) -> Result<(), SlotError> {
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get(i))
            .ok_or(SlotError::OutOfRange {
                index,
                slots: self.slots.len(),
            })?;
        slot.store(value.to_le(), Ordering::Relaxed);
        Ok(())
    }

    /// Reads back slot `index`.
    #[must_use]
    pub fn read(&self, index: u64) -> Option<u32> {
        let slot = self.slots.get(usize::try_from(index).ok()?)?;
        Some(u32::from_le(slot.load(Ordering::Relaxed)))
    }
}

impl fmt::Debug for SlotWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotWriter")
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content).expect("write");
        file.flush().expect("flush");
        file
    }

    #[test]
    fn page_size_is_power_of_two_multiple_of_slot() {
        let size = page_size();
        assert!(size.is_power_of_two());
        assert_eq!(size % SLOT_WIDTH, 0);
    }

    #[test]
    fn region_covers_exact_range() {
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let file = temp_file_with(&content);
        let mapped = MappedFile::open_read(file.path()).expect("open");
        assert_eq!(mapped.len(), content.len() as u64);

        let region = mapped.map_region(4097, 123).expect("map");
        assert_eq!(region.offset(), 4097);
        assert_eq!(&region[..], &content[4097..4097 + 123]);
    }

    #[test]
    fn region_past_end_is_rejected() {
        let file = temp_file_with(b"short");
        let mapped = MappedFile::open_read(file.path()).expect("open");
        let error = mapped.map_region(3, 10).expect_err("out of range");
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn empty_region_needs_no_mapping() {
        let file = temp_file_with(b"");
        let mapped = MappedFile::open_read(file.path()).expect("open");
        assert!(mapped.is_empty());
        let region = mapped.map_region(0, 0).expect("map");
        assert!(region.is_empty());
    }

    #[test]
    fn writable_region_requires_read_write_handle() {
        let file = temp_file_with(&[0u8; 16]);
        let mapped = MappedFile::open_read(file.path()).expect("open");
        let error = mapped.map_region_mut(0, 16).expect_err("read-only");
        assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn slot_writes_reach_the_file() {
        let file = temp_file_with(&[0u8; 16]);
        let mapped = MappedFile::open_read_write(file.path()).expect("open");
        {
            let mut region = mapped.map_region_mut(0, 16).expect("map");
            let slots = region.slots().expect("slots");
            assert_eq!(slots.len(), 4);
            slots.write(0, 0x0403_0201).expect("slot 0");
            slots.write(3, 0xDEAD_BEEF).expect("slot 3");
            assert_eq!(slots.read(3), Some(0xDEAD_BEEF));
            region.flush().expect("flush");
        }

        let bytes = std::fs::read(file.path()).expect("read back");
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
        assert_eq!(&bytes[12..], &0xDEAD_BEEFu32.to_le_bytes());
    }

    #[test]
    fn slot_out_of_range_is_reported() {
        let file = temp_file_with(&[0u8; 8]);
        let mapped = MappedFile::open_read_write(file.path()).expect("open");
        let mut region = mapped.map_region_mut(0, 8).expect("map");
        let slots = region.slots().expect("slots");
        assert_eq!(
            slots.write(2, 1),
            Err(SlotError::OutOfRange { index: 2, slots: 2 })
        );
        assert_eq!(slots.read(2), None);
    }

    #[test]
    fn ragged_buffer_is_rejected() {
        let mut bytes = [0u8; 7];
        assert_eq!(
            SlotWriter::from_bytes(&mut bytes).err(),
            Some(SlotError::Misaligned { len: 7 })
        );
    }

    #[test]
    fn resize_creates_and_truncates() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("sized");
        resize_file(&path, 40).expect("grow");
        assert_eq!(file_len(&path).expect("len"), 40);
        resize_file(&path, 12).expect("shrink");
        assert_eq!(file_len(&path).expect("len"), 12);
        assert_eq!(std::fs::read(&path).expect("read"), vec![0u8; 12]);
    }
}
