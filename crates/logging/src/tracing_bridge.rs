//! crates/logging/src/tracing_bridge.rs
//! Installs a `tracing` subscriber configured from a [`VerbosityConfig`].
//!
//! Events are filtered per target with an [`EnvFilter`] and written to
//! standard error by the `fmt` layer. A directive in `BLOCKSIG_LOG` replaces
//! the one derived from the verbosity level, which makes it possible to turn
//! on per-block tracing without touching the command line.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! let config = VerbosityConfig::from_verbose_level(2);
//! init_tracing(config).ok();
//!
//! tracing::info!(target: "signature", "destination sized");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use super::config::{LOG_ENV_VAR, VerbosityConfig};

/// Builds the filter for `config`, preferring a valid directive in
/// `env_directive` when one is supplied.
#[must_use]
pub fn build_filter(config: &VerbosityConfig, env_directive: Option<&str>) -> EnvFilter {
    env_directive
        .filter(|directive| !directive.trim().is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(config.directive()))
}

/// Installs the global subscriber.
///
/// Fails when a global subscriber is already installed, which callers that
/// may run more than once in a process (tests, embedders) should ignore.
pub fn init_tracing(config: VerbosityConfig) -> Result<(), TryInitError> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    init_tracing_with_filter(build_filter(&config, env.as_deref()))
}

/// Installs the global subscriber with a caller-built filter.
pub fn init_tracing_with_filter(filter: EnvFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true),
        )
        .try_init()
}
