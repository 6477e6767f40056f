//! crates/signature/src/options.rs
//!
//! Tunables for [`create_signature`](crate::create_signature).

use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use fast_io::parallel::{DistributorConfig, FailurePolicy};

/// Canonical block size in bytes.
///
/// Signature files carry no header, so producer and consumer must agree on the
/// block size out of band. Unless both sides say otherwise, it is this value.
pub const DEFAULT_BLOCK_SIZE: NonZeroU64 = match NonZeroU64::new(2048) {
    Some(size) => size,
    None => panic!("default block size must be non-zero"),
};

/// Options controlling one signature run.
///
/// Construct with [`SignatureOptions::builder`] or use the default: 2 KiB
/// blocks, one worker per hardware thread, page-sized output windows.
#[derive(Clone, Debug)]
pub struct SignatureOptions {
    block_size: NonZeroU64,
    distributor: DistributorConfig,
    window_size: Option<NonZeroUsize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl SignatureOptions {
    /// Returns a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> SignatureOptionsBuilder {
        SignatureOptionsBuilder::default()
    }

    /// Options with the given block size and every other setting defaulted.
    #[must_use]
    pub fn with_block_size(block_size: NonZeroU64) -> Self {
        Self::builder().block_size(block_size).build()
    }

    /// Size of each source block in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> NonZeroU64 {
        self.block_size
    }

    /// Worker pool configuration.
    #[inline]
    #[must_use]
    pub const fn distributor(&self) -> DistributorConfig {
        self.distributor
    }

    /// Output window size override; `None` means one OS page.
    #[inline]
    #[must_use]
    pub const fn window_size(&self) -> Option<NonZeroUsize> {
        self.window_size
    }

    /// Cancellation flag polled between blocks.
    #[must_use]
    pub fn cancel_flag(&self) -> Option<&Arc<AtomicBool>> {
        self.cancel.as_ref()
    }
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`SignatureOptions`].
#[derive(Clone, Debug)]
pub struct SignatureOptionsBuilder {
    block_size: NonZeroU64,
    distributor: DistributorConfig,
    window_size: Option<NonZeroUsize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for SignatureOptionsBuilder {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            distributor: DistributorConfig::default(),
            window_size: None,
            cancel: None,
        }
    }
}

impl SignatureOptionsBuilder {
    /// Sets the source block size in bytes.
    #[must_use]
    #[doc(alias = "--block-size-bytes")]
    pub const fn block_size(mut self, block_size: NonZeroU64) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the number of concurrent workers.
    #[must_use]
    #[doc(alias = "--threads")]
    pub const fn threads(mut self, threads: NonZeroUsize) -> Self {
        self.distributor = self.distributor.with_threads(threads);
        self
    }

    /// Sets what happens to the other workers when one block fails.
    #[must_use]
    pub const fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.distributor = self.distributor.with_failure_policy(policy);
        self
    }

    /// Replaces the whole worker pool configuration.
    #[must_use]
    pub const fn distributor(mut self, config: DistributorConfig) -> Self {
        self.distributor = config;
        self
    }

    /// Overrides the output window size.
    ///
    /// The value is rounded down to a multiple of four bytes. Mainly useful to
    /// exercise multi-window runs on small inputs.
    #[must_use]
    pub const fn window_size(mut self, window_size: Option<NonZeroUsize>) -> Self {
        self.window_size = window_size;
        self
    }

    /// Installs a flag that aborts the run once set.
    #[must_use]
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Finalises the options.
    #[must_use]
    pub fn build(self) -> SignatureOptions {
        SignatureOptions {
            block_size: self.block_size,
            distributor: self.distributor,
            window_size: self.window_size,
            cancel: self.cancel,
        }
    }
}
