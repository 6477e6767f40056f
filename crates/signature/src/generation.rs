//! crates/signature/src/generation.rs
//!
//! The signature driver: validate, size, map, fill windows, return.

use std::fs::{self, Metadata, OpenOptions};
use std::io;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use checksums::{BlockChecksum, Crc32};
use fast_io::mmap::{self, MappedFile, SlotError};
use fast_io::parallel::{WorkCursor, WorkDistributor};
#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument};

use crate::block::process_block;
use crate::error::{PathErrorKind, PathRole, SignatureError};
use crate::layout::{SignatureLayout, Window};
use crate::options::SignatureOptions;

/// Outcome of a successful signature run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureSummary {
    /// Number of blocks, and therefore checksum slots, written.
    pub block_count: u64,
    /// Number of output windows that were mapped and flushed.
    pub windows: u64,
    /// Final length of the signature file in bytes.
    pub signature_len: u64,
    /// Block size the signature was computed with.
    pub block_size: NonZeroU64,
}

/// Writes the CRC-32 block signature of `source` to `destination`.
///
/// The destination is created when missing and truncated or extended to
/// exactly `4 * ceil(len / block_size)` bytes. A worker pool is built from
/// [`SignatureOptions::distributor`] for the duration of the call; use
/// [`create_signature_with`] to reuse one across calls.
///
/// On error the destination content is unspecified.
pub fn create_signature(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &SignatureOptions,
) -> Result<SignatureSummary, SignatureError> {
    let distributor = WorkDistributor::new(options.distributor())?;
    create_signature_with(source, destination, options, &distributor, &Crc32)
}

/// Writes a block signature using a caller-supplied worker pool and checksum.
///
/// The distributor settings in `options` are ignored; `distributor` is used
/// as given.
pub fn create_signature_with<C>(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &SignatureOptions,
    distributor: &WorkDistributor,
    checksum: &C,
) -> Result<SignatureSummary, SignatureError>
where
    C: BlockChecksum + ?Sized,
{
    generate(
        source.as_ref(),
        destination.as_ref(),
        options,
        distributor,
        checksum,
    )
}

#[cfg_attr(
    feature = "tracing",
    instrument(
        skip(options, distributor, checksum),
        fields(block_size = options.block_size().get(), algorithm = checksum.name()),
        name = "create_signature"
    )
)]
fn generate<C>(
    source: &Path,
    destination: &Path,
    options: &SignatureOptions,
    distributor: &WorkDistributor,
    checksum: &C,
) -> Result<SignatureSummary, SignatureError>
where
    C: BlockChecksum + ?Sized,
{
    // Validate
    let source_len = validate_paths(source, destination)?;

    // Size
    let layout = SignatureLayout::new(source_len, options.block_size())?;
    mmap::resize_file(destination, layout.signature_len())
        .map_err(|error| SignatureError::io("resize", destination, error))?;

    #[cfg(feature = "tracing")]
    info!(
        source_len,
        block_count = layout.block_count(),
        signature_len = layout.signature_len(),
        "destination sized"
    );

    // Map
    let source_map = MappedFile::open_read(source)
        .map_err(|error| SignatureError::io("open", source, error))?;
    if source_map.len() != source_len {
        return Err(SignatureError::SourceChanged {
            expected: source_len,
            actual: source_map.len(),
        });
    }
    let output_map = MappedFile::open_read_write(destination)
        .map_err(|error| SignatureError::io("open", destination, error))?;

    // Iterate windows
    let window_size = options
        .window_size()
        .map_or_else(mmap::page_size, NonZeroUsize::get);
    let cancel = options.cancel_flag();
    let mut windows = 0;

    for window in layout.windows(window_size) {
        if is_cancelled(cancel) {
            return Err(SignatureError::Cancelled {
                processed: window.first_block,
                total: layout.block_count(),
            });
        }

        fill_window(
            &layout,
            window,
            &source_map,
            &output_map,
            distributor,
            checksum,
            cancel,
        )?;
        windows += 1;
    }

    // Return
    let summary = SignatureSummary {
        block_count: layout.block_count(),
        windows,
        signature_len: layout.signature_len(),
        block_size: layout.block_size(),
    };

    #[cfg(feature = "tracing")]
    info!(
        block_count = summary.block_count,
        windows = summary.windows,
        "signature complete"
    );

    Ok(summary)
}

/// Maps one output window, fills every slot through the distributor and
/// flushes it.
fn fill_window<C>(
    layout: &SignatureLayout,
    window: Window,
    source: &MappedFile,
    output: &MappedFile,
    distributor: &WorkDistributor,
    checksum: &C,
    cancel: Option<&Arc<AtomicBool>>,
) -> Result<(), SignatureError>
where
    C: BlockChecksum + ?Sized,
{
    let mut region = output
        .map_region_mut(window.offset, window.len)
        .map_err(|error| SignatureError::io("map", output.path(), error))?;

    let completed = {
        let slots = region.slots().map_err(SignatureError::ConcurrencyFault)?;
        let cursor = match cancel {
            Some(flag) => WorkCursor::with_cancellation(window.slots, Arc::clone(flag)),
            None => WorkCursor::new(window.slots),
        };

        let task = |index: u64| {
            let block = window.first_block + index;
            let range = layout.block_range(block).ok_or_else(|| {
                SignatureError::ConcurrencyFault(SlotError::OutOfRange {
                    index,
                    slots: slots.len(),
                })
            })?;

            let result = process_block(source, range, &slots, index, checksum);
            if matches!(result, Err(SignatureError::ConcurrencyFault(_))) {
                cursor.abort();
            }
            result
        };

        distributor.execute(task, || cursor.next())?.completed
    };

    if completed < window.slots {
        return Err(SignatureError::Cancelled {
            processed: window.first_block + completed,
            total: layout.block_count(),
        });
    }

    region
        .flush()
        .map_err(|error| SignatureError::io("flush", output.path(), error))?;

    #[cfg(feature = "tracing")]
    debug!(
        window = window.index,
        offset = window.offset,
        first_block = window.first_block,
        slots = window.slots,
        "window flushed"
    );

    Ok(())
}

fn is_cancelled(flag: Option<&Arc<AtomicBool>>) -> bool {
    flag.is_some_and(|flag| flag.load(Ordering::Acquire))
}

/// Checks both paths and creates a missing destination.
///
/// Returns the source length.
fn validate_paths(source: &Path, destination: &Path) -> Result<u64, SignatureError> {
    let source_meta = inspect(source, PathRole::Source)?
        .ok_or_else(|| SignatureError::path(PathRole::Source, source, PathErrorKind::Missing))?;
    if !source_meta.is_file() {
        return Err(SignatureError::path(
            PathRole::Source,
            source,
            PathErrorKind::NotRegularFile,
        ));
    }

    match inspect(destination, PathRole::Destination)? {
        Some(meta) if !meta.is_file() => {
            return Err(SignatureError::path(
                PathRole::Destination,
                destination,
                PathErrorKind::NotRegularFile,
            ));
        }
        Some(meta) => {
            if same_file(source, &source_meta, destination, &meta) {
                return Err(SignatureError::path(
                    PathRole::Destination,
                    destination,
                    PathErrorKind::SameFile,
                ));
            }
        }
        None => {
            // A dangling symlink also lands here; opening through it creates
            // the link target.
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(destination)
                .map_err(|error| SignatureError::io("create", destination, error))?;
        }
    }

    Ok(source_meta.len())
}

/// Returns the metadata of `path`, or `None` when nothing exists there.
fn inspect(path: &Path, role: PathRole) -> Result<Option<Metadata>, SignatureError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => {
            let action = match role {
                PathRole::Source => "inspect source",
                PathRole::Destination => "inspect destination",
            };
            Err(SignatureError::io(action, path, error))
        }
    }
}

#[cfg(unix)]
fn same_file(_: &Path, a: &Metadata, _: &Path, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &Path, _: &Metadata, b: &Path, _: &Metadata) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
