//! crates/signature/src/error.rs
//!
//! Error taxonomy for signature generation and consumption.

use std::fmt;
use std::io;
use std::path::PathBuf;

use fast_io::mmap::SlotError;
use fast_io::parallel::DistributorError;
use thiserror::Error;

use crate::layout::LayoutError;

/// Which operand of [`create_signature`](crate::create_signature) a path
/// error refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PathRole {
    /// The file being signed.
    Source,
    /// The signature file being written.
    Destination,
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Destination => "destination",
        })
    }
}

/// Reason a path was rejected during validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PathErrorKind {
    /// Nothing exists at the path.
    Missing,
    /// The path exists but names a directory, socket, device or similar.
    NotRegularFile,
    /// The destination resolves to the source file itself.
    SameFile,
}

impl fmt::Display for PathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "does not exist",
            Self::NotRegularFile => "is not a regular file",
            Self::SameFile => "is the same file as the source",
        })
    }
}

/// Coarse classification of a [`SignatureError`].
///
/// Front-ends map these onto exit codes or status values without matching
/// every variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A path failed validation.
    Path,
    /// An operating-system call failed.
    Io,
    /// An internal invariant was violated.
    ConcurrencyFault,
    /// The operation was cancelled before completion.
    Cancelled,
    /// The request or input data was not acceptable.
    Invalid,
}

/// Errors produced while creating or reading a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// A path failed validation before any I/O on its content.
    #[error("{role} '{}' {kind}", path.display())]
    Path {
        /// Which operand the path belongs to.
        role: PathRole,
        /// The rejected path.
        path: PathBuf,
        /// Why it was rejected.
        kind: PathErrorKind,
    },

    /// An I/O operation failed.
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        /// What was being attempted, e.g. `"map"`.
        action: &'static str,
        /// File the operation targeted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A worker addressed a slot outside its window.
    #[error("concurrency fault: {0}")]
    ConcurrencyFault(#[source] SlotError),

    /// The source is too large to be described by a signature.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The block size cannot be mapped in one piece on this platform.
    #[error("block size {block_size} exceeds the addressable range")]
    BlockTooLarge {
        /// Requested block size in bytes.
        block_size: u64,
    },

    /// The worker pool could not be started.
    #[error(transparent)]
    Distributor(#[from] DistributorError),

    /// The cancellation flag was raised.
    #[error("cancelled after {processed} of {total} block(s)")]
    Cancelled {
        /// Blocks whose checksum had been written.
        processed: u64,
        /// Total number of blocks.
        total: u64,
    },

    /// The source changed size between validation and mapping.
    #[error("source changed size during the operation: expected {expected} bytes, found {actual}")]
    SourceChanged {
        /// Length observed when the destination was sized.
        expected: u64,
        /// Length observed when the source was mapped.
        actual: u64,
    },

    /// A signature file is not a whole number of checksum slots.
    #[error("'{}' is not a signature file: {len} bytes is not a multiple of 4", path.display())]
    Malformed {
        /// Offending file.
        path: PathBuf,
        /// Its length in bytes.
        len: u64,
    },
}

impl SignatureError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn path(role: PathRole, path: impl Into<PathBuf>, kind: PathErrorKind) -> Self {
        Self::Path {
            role,
            path: path.into(),
            kind,
        }
    }

    /// Returns the coarse class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Path { .. } => ErrorKind::Path,
            Self::Io { .. } | Self::Distributor(_) | Self::SourceChanged { .. } => ErrorKind::Io,
            Self::ConcurrencyFault(_) => ErrorKind::ConcurrencyFault,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Layout(_) | Self::BlockTooLarge { .. } | Self::Malformed { .. } => {
                ErrorKind::Invalid
            }
        }
    }
}
