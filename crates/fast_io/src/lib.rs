//! Memory-mapped I/O and bounded worker pools for block signature generation.
//!
//! This crate provides the operating-system facing primitives the signature
//! engine is built on.
//!
//! # Features
//!
//! - **Memory-mapped regions** over an arbitrary byte range of a file, in
//!   read-only or read-write mode, with explicit flushing
//! - **Slot writers** that let many threads store 32-bit values into disjoint
//!   slots of one writable mapping
//! - **Work distribution** across a fixed set of workers pulling indices from a
//!   shared, bounded cursor
//!
//! # Design Principles
//!
//! 1. **Bounded working set** - map only the range being processed
//! 2. **Explicit ownership** - worker pools are values, never process globals
//! 3. **Errors are values** - task failures are collected and returned after
//!    every worker has joined

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

pub mod mmap;
pub mod parallel;

pub use mmap::{
    MapMode, MappedFile, MappedRegion, MappedRegionMut, SLOT_WIDTH, SlotError, SlotWriter,
    file_len, page_size, resize_file,
};
pub use parallel::{
    DistributorConfig, DistributorError, ExecutionReport, FailurePolicy, WorkCursor,
    WorkDistributor,
};
