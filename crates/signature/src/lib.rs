#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `signature` computes block-granular checksum signatures of files. The
//! source is split into fixed-size blocks, each block is checksummed
//! independently, and the checksums are stored as a dense array of
//! little-endian `u32` values in the signature file. Comparing two signature
//! files produced with the same block size reveals which blocks changed
//! without reading either source again.
//!
//! # Design
//!
//! [`create_signature`] runs five sequential phases: validate the paths, size
//! the destination to exactly `4 * ceil(len / block_size)` bytes, open
//! whole-file mapping handles, fill the destination one page-sized window at
//! a time, and return. Inside a window every slot is filled concurrently by
//! a [`WorkDistributor`](fast_io::WorkDistributor) whose workers pull slot
//! indices from a shared [`WorkCursor`](fast_io::WorkCursor). Windows are
//! processed strictly one after the other and flushed before the next one is
//! mapped.
//!
//! # Invariants
//!
//! - The destination has its final size before any window is mapped.
//! - Each slot of a window is handed to exactly one worker.
//! - Each worker maps only the source range of the block it is processing.
//!
//! # File format
//!
//! There is no header: the block size is not recorded and must be agreed
//! out of band. [`DEFAULT_BLOCK_SIZE`] is the canonical value.
//!
//! # Examples
//!
//! ```no_run
//! use signature::{SignatureOptions, create_signature};
//!
//! let options = SignatureOptions::default();
//! let summary = create_signature("disk.img", "disk.sig", &options)?;
//! println!("{} blocks", summary.block_count);
//! # Ok::<(), signature::SignatureError>(())
//! ```

mod block;
mod compare;
mod error;
mod generation;
mod layout;
mod options;

pub use block::process_block;
pub use compare::{SignatureDiff, compare_signatures, decode_signature, read_signature};
pub use error::{ErrorKind, PathErrorKind, PathRole, SignatureError};
pub use generation::{SignatureSummary, create_signature, create_signature_with};
pub use layout::{BlockRange, CHECKSUM_WIDTH, LayoutError, SignatureLayout, Window, Windows};
pub use options::{DEFAULT_BLOCK_SIZE, SignatureOptions, SignatureOptionsBuilder};
