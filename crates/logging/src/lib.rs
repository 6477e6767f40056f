#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` turns the command line's `-v` count into per-component log
//! levels and, with the `tracing` feature, installs the process-wide
//! `tracing` subscriber that renders engine events on standard error.
//!
//! # Design
//!
//! [`VerbosityConfig::from_verbose_level`] maps a verbosity count onto a
//! [`ComponentLevels`] set, one [`LogLevel`] per [`Component`]. The
//! configuration renders to a filter directive keyed by crate target, so the
//! engine, the worker pool and the front-end can be tuned independently. The
//! `BLOCKSIG_LOG` environment variable overrides the derived directive.
//!
//! # Examples
//!
//! ```
//! use logging::{LogLevel, VerbosityConfig};
//!
//! let config = VerbosityConfig::from_verbose_level(2);
//! assert_eq!(config.components.engine, LogLevel::Debug);
//! assert!(config.directive().contains("signature=debug"));
//! ```

mod config;
mod levels;
#[cfg(feature = "tracing")]
mod tracing_bridge;

pub use config::{LOG_ENV_VAR, VerbosityConfig};
pub use levels::{Component, ComponentLevels, LogLevel};
#[cfg(feature = "tracing")]
pub use tracing_bridge::{build_filter, init_tracing, init_tracing_with_filter};
