//! crates/signature/src/compare.rs
//!
//! Consumer side: load signature files and find the blocks that differ.

use std::fs;
use std::ops::Range;
use std::path::Path;

use crate::error::SignatureError;
use crate::layout::CHECKSUM_WIDTH;

/// Decodes a signature held in memory.
///
/// Returns `None` when `bytes` is not a whole number of checksum slots.
#[must_use]
pub fn decode_signature(bytes: &[u8]) -> Option<Vec<u32>> {
    let chunks = bytes.chunks_exact(CHECKSUM_WIDTH as usize);
    if !chunks.remainder().is_empty() {
        return None;
    }
    Some(
        chunks
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Reads the signature file at `path` into one checksum per block.
pub fn read_signature(path: impl AsRef<Path>) -> Result<Vec<u32>, SignatureError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|error| SignatureError::io("read", path, error))?;
    decode_signature(&bytes).ok_or_else(|| SignatureError::Malformed {
        path: path.to_path_buf(),
        len: bytes.len() as u64,
    })
}

/// Block-level difference between two signatures of the same block size.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignatureDiff {
    /// Indices present in both signatures whose checksums differ, ascending.
    pub changed: Vec<u64>,
    /// Block count of the old signature.
    pub old_blocks: u64,
    /// Block count of the new signature.
    pub new_blocks: u64,
}

impl SignatureDiff {
    /// Returns `true` when both signatures are identical.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.changed.is_empty() && self.old_blocks == self.new_blocks
    }

    /// Blocks present only in the new signature.
    #[must_use]
    pub fn appended(&self) -> Range<u64> {
        self.old_blocks.min(self.new_blocks)..self.new_blocks
    }

    /// Blocks present only in the old signature.
    #[must_use]
    pub fn removed(&self) -> Range<u64> {
        self.old_blocks.min(self.new_blocks)..self.old_blocks
    }

    /// Coalesces [`changed`](Self::changed) into runs of consecutive blocks.
    #[must_use]
    pub fn changed_runs(&self) -> Vec<Range<u64>> {
        let mut runs: Vec<Range<u64>> = Vec::new();
        for &index in &self.changed {
            match runs.last_mut() {
                Some(run) if run.end == index => run.end += 1,
                _ => runs.push(index..index + 1),
            }
        }
        runs
    }
}

/// Compares two decoded signatures slot by slot.
#[must_use]
pub fn compare_signatures(old: &[u32], new: &[u32]) -> SignatureDiff {
    let changed = old
        .iter()
        .zip(new)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(index, _)| index as u64)
        .collect();

    SignatureDiff {
        changed,
        old_blocks: old.len() as u64,
        new_blocks: new.len() as u64,
    }
}
