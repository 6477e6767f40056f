//! End-to-end tests of signature generation against real files.
//!
//! Each test builds a source file in a temporary directory, runs the driver
//! and inspects the signature file byte by byte.

use std::fs;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use checksums::{BlockChecksum, Crc32};
use fast_io::parallel::WorkDistributor;
use proptest::prelude::*;
use signature::{
    ErrorKind, PathErrorKind, PathRole, SignatureError, SignatureOptions, create_signature,
    create_signature_with, read_signature,
};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    fn source(&self, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join("source.bin");
        fs::write(&path, content).expect("write source");
        path
    }

    fn destination(&self) -> PathBuf {
        self.dir.path().join("source.sig")
    }
}

fn block_size(bytes: u64) -> NonZeroU64 {
    NonZeroU64::new(bytes).expect("non-zero block size")
}

fn options(bytes: u64) -> SignatureOptions {
    SignatureOptions::with_block_size(block_size(bytes))
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

fn expected_signature(content: &[u8], block: usize) -> Vec<u32> {
    content.chunks(block).map(Crc32::digest).collect()
}

fn signature_len(path: &Path) -> u64 {
    fs::metadata(path).expect("signature metadata").len()
}

// =============================================================================
// Validation
// =============================================================================

mod validation {
    use super::*;

    #[test]
    fn missing_source_is_path_error() {
        let fixture = Fixture::new();
        let source = fixture.dir.path().join("absent");

        let error = create_signature(&source, fixture.destination(), &options(512))
            .expect_err("missing source");
        assert_eq!(error.kind(), ErrorKind::Path);
        assert!(matches!(
            error,
            SignatureError::Path {
                role: PathRole::Source,
                kind: PathErrorKind::Missing,
                ..
            }
        ));
    }

    #[test]
    fn missing_source_fails_even_when_destination_is_invalid() {
        let fixture = Fixture::new();
        let source = fixture.dir.path().join("absent");

        let error = create_signature(&source, fixture.dir.path(), &options(512))
            .expect_err("missing source");
        assert!(matches!(
            error,
            SignatureError::Path {
                role: PathRole::Source,
                ..
            }
        ));
    }

    #[test]
    fn directory_source_is_path_error() {
        let fixture = Fixture::new();

        let error = create_signature(fixture.dir.path(), fixture.destination(), &options(512))
            .expect_err("directory source");
        assert!(matches!(
            error,
            SignatureError::Path {
                role: PathRole::Source,
                kind: PathErrorKind::NotRegularFile,
                ..
            }
        ));
    }

    #[test]
    fn directory_destination_is_path_error() {
        let fixture = Fixture::new();
        let source = fixture.source(b"content");
        let destination = fixture.dir.path().join("subdir");
        fs::create_dir(&destination).expect("mkdir");

        let error =
            create_signature(&source, &destination, &options(512)).expect_err("directory dest");
        assert!(matches!(
            error,
            SignatureError::Path {
                role: PathRole::Destination,
                kind: PathErrorKind::NotRegularFile,
                ..
            }
        ));
    }

    #[test]
    fn missing_destination_is_created() {
        let fixture = Fixture::new();
        let source = fixture.source(&patterned(512));
        let destination = fixture.destination();
        assert!(!destination.exists());

        create_signature(&source, &destination, &options(512)).expect("signature");
        assert_eq!(signature_len(&destination), 4);
    }

    #[test]
    fn uncreatable_destination_is_io_error() {
        let fixture = Fixture::new();
        let source = fixture.source(b"content");
        let destination = fixture.dir.path().join("no").join("such").join("dir.sig");

        let error = create_signature(&source, &destination, &options(512))
            .expect_err("parent directory missing");
        assert_eq!(error.kind(), ErrorKind::Io);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_destination_creates_target() {
        let fixture = Fixture::new();
        let content = patterned(10);
        let source = fixture.source(&content);
        let target = fixture.dir.path().join("target.sig");
        let link = fixture.dir.path().join("link.sig");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");
        assert!(!target.exists());

        let summary = create_signature(&source, &link, &options(4)).expect("signature");

        assert_eq!(summary.block_count, 3);
        assert!(fs::symlink_metadata(&link).expect("link").file_type().is_symlink());
        assert_eq!(
            read_signature(&target).expect("decode"),
            expected_signature(&content, 4)
        );
    }
}

// =============================================================================
// Sizing
// =============================================================================

mod sizing {
    use super::*;

    #[test]
    fn zero_length_source_yields_empty_signature() {
        let fixture = Fixture::new();
        let source = fixture.source(b"");
        let destination = fixture.destination();
        fs::write(&destination, b"stale content").expect("pre-existing destination");

        let calls = AtomicU32::new(0);
        let counting = Counting {
            calls: &calls,
            delay: None,
        };
        let distributor = WorkDistributor::new(options(512).distributor()).expect("pool");

        let summary =
            create_signature_with(&source, &destination, &options(512), &distributor, &counting)
                .expect("signature");
        assert_eq!(summary.block_count, 0);
        assert_eq!(summary.windows, 0);
        assert_eq!(signature_len(&destination), 0);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn existing_larger_destination_is_truncated() {
        let fixture = Fixture::new();
        let source = fixture.source(&patterned(100));
        let destination = fixture.destination();
        fs::write(&destination, vec![0xFF; 10_000]).expect("pre-existing destination");

        create_signature(&source, &destination, &options(10)).expect("signature");
        assert_eq!(signature_len(&destination), 40);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn signature_is_four_bytes_per_block(len in 0usize..=20_000, block in 1u64..=4_096) {
            let fixture = Fixture::new();
            let source = fixture.source(&patterned(len));
            let destination = fixture.destination();

            let summary = create_signature(&source, &destination, &options(block)).expect("signature");
            let expected = 4 * (len as u64).div_ceil(block);
            prop_assert_eq!(signature_len(&destination), expected);
            prop_assert_eq!(summary.signature_len, expected);
        }
    }
}

// =============================================================================
// Correctness
// =============================================================================

mod correctness {
    use super::*;

    #[test]
    fn single_block_holds_crc_of_whole_file() {
        let fixture = Fixture::new();
        let content = patterned(512);
        let source = fixture.source(&content);
        let destination = fixture.destination();

        create_signature(&source, &destination, &options(512)).expect("signature");

        let bytes = fs::read(&destination).expect("read signature");
        assert_eq!(bytes, Crc32::digest(&content).to_le_bytes());
    }

    #[test]
    fn block_larger_than_source_is_single_slot() {
        let fixture = Fixture::new();
        let content = patterned(300);
        let source = fixture.source(&content);
        let destination = fixture.destination();

        let summary = create_signature(&source, &destination, &SignatureOptions::default())
            .expect("signature");
        assert_eq!(summary.block_count, 1);
        assert_eq!(
            read_signature(&destination).expect("decode"),
            vec![Crc32::digest(&content)]
        );
    }

    #[test]
    fn trailing_byte_gets_its_own_block() {
        let fixture = Fixture::new();
        let block = 1000;
        let content = patterned(2 * block + 1);
        let source = fixture.source(&content);
        let destination = fixture.destination();

        create_signature(&source, &destination, &options(block as u64)).expect("signature");

        let signature = read_signature(&destination).expect("decode");
        assert_eq!(signature.len(), 3);
        assert_eq!(signature[0], Crc32::digest(&content[..block]));
        assert_eq!(signature[1], Crc32::digest(&content[block..2 * block]));
        assert_eq!(signature[2], Crc32::digest(&content[2 * block..]));
    }

    #[test]
    fn signature_spanning_many_pages() {
        let fixture = Fixture::new();
        // 20_000 blocks of 4 bytes -> 80_000 signature bytes, several pages.
        let content: Vec<u8> = (0..80_000u32).map(|i| (i.wrapping_mul(31) >> 3) as u8).collect();
        let source = fixture.source(&content);
        let destination = fixture.destination();

        let summary = create_signature(&source, &destination, &options(4)).expect("signature");
        assert!(summary.windows >= 2);
        assert_eq!(
            read_signature(&destination).expect("decode"),
            expected_signature(&content, 4)
        );
    }

    #[test]
    fn small_windows_match_page_windows() {
        let fixture = Fixture::new();
        let content = patterned(12_345);
        let source = fixture.source(&content);
        let paged = fixture.dir.path().join("paged.sig");
        let narrow = fixture.dir.path().join("narrow.sig");

        create_signature(&source, &paged, &options(7)).expect("paged");
        let options = SignatureOptions::builder()
            .block_size(block_size(7))
            .window_size(NonZeroUsize::new(12))
            .build();
        let summary = create_signature(&source, &narrow, &options).expect("narrow");

        assert_eq!(summary.windows, 1764u64.div_ceil(3));
        assert_eq!(fs::read(&paged).expect("paged"), fs::read(&narrow).expect("narrow"));
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let fixture = Fixture::new();
        let content = patterned(50_000);
        let source = fixture.source(&content);
        let first = fixture.dir.path().join("first.sig");
        let second = fixture.dir.path().join("second.sig");

        create_signature(&source, &first, &options(333)).expect("first");
        create_signature(&source, &second, &options(333)).expect("second");
        let first_bytes = fs::read(&first).expect("first");
        assert_eq!(first_bytes, fs::read(&second).expect("second"));

        create_signature(&source, &first, &options(333)).expect("rerun in place");
        assert_eq!(first_bytes, fs::read(&first).expect("first again"));
    }
}

// =============================================================================
// Concurrency
// =============================================================================

/// Checksum that counts invocations and can be artificially slowed down.
struct Counting<'a> {
    calls: &'a AtomicU32,
    delay: Option<Duration>,
}

impl BlockChecksum for Counting<'_> {
    fn checksum(&self, bytes: &[u8]) -> u32 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Crc32::digest(bytes)
    }

    fn name(&self) -> &'static str {
        "counting-crc32"
    }
}

mod concurrency {
    use super::*;

    fn run_with_workers(threads: usize, content: &[u8], block: u64, delay: Option<Duration>) {
        let fixture = Fixture::new();
        let source = fixture.source(content);
        let destination = fixture.destination();
        let options = SignatureOptions::builder()
            .block_size(block_size(block))
            .threads(NonZeroUsize::new(threads).expect("threads"))
            .window_size(NonZeroUsize::new(256))
            .build();
        let distributor = WorkDistributor::new(options.distributor()).expect("pool");
        let calls = AtomicU32::new(0);
        let checksum = Counting {
            calls: &calls,
            delay,
        };

        let summary =
            create_signature_with(&source, &destination, &options, &distributor, &checksum)
                .expect("signature");

        assert_eq!(u64::from(calls.load(Ordering::Relaxed)), summary.block_count);
        assert_eq!(
            read_signature(&destination).expect("decode"),
            expected_signature(content, block as usize)
        );
    }

    #[test]
    fn one_worker() {
        run_with_workers(1, &patterned(10_000), 9, None);
    }

    #[test]
    fn two_workers() {
        run_with_workers(2, &patterned(10_000), 9, None);
    }

    #[test]
    fn many_workers_with_slow_checksum() {
        run_with_workers(32, &patterned(4_000), 8, Some(Duration::from_micros(300)));
    }

    #[test]
    fn distributor_is_reused_across_runs() {
        let fixture = Fixture::new();
        let distributor = WorkDistributor::new(options(64).distributor()).expect("pool");

        for len in [0usize, 1, 63, 64, 65, 10_000] {
            let content = patterned(len);
            let source = fixture.source(&content);
            let destination = fixture.destination();
            create_signature_with(&source, &destination, &options(64), &distributor, &Crc32)
                .expect("signature");
            assert_eq!(
                read_signature(&destination).expect("decode"),
                expected_signature(&content, 64)
            );
        }
    }

    /// Raises the cancellation flag while computing block `trigger`.
    struct CancelAfter {
        calls: AtomicU32,
        trigger: u32,
        flag: Arc<AtomicBool>,
    }

    impl BlockChecksum for CancelAfter {
        fn checksum(&self, bytes: &[u8]) -> u32 {
            if self.calls.fetch_add(1, Ordering::Relaxed) + 1 == self.trigger {
                self.flag.store(true, Ordering::Release);
            }
            Crc32::digest(bytes)
        }

        fn name(&self) -> &'static str {
            "cancel-after"
        }
    }

    #[test]
    fn cancellation_inside_a_window_stops_the_run() {
        let fixture = Fixture::new();
        let source = fixture.source(&patterned(100));
        let destination = fixture.destination();
        let flag = Arc::new(AtomicBool::new(false));
        let options = SignatureOptions::builder()
            .block_size(block_size(1))
            .threads(NonZeroUsize::MIN)
            .cancel_flag(Arc::clone(&flag))
            .build();
        let distributor = WorkDistributor::new(options.distributor()).expect("pool");
        let checksum = CancelAfter {
            calls: AtomicU32::new(0),
            trigger: 10,
            flag,
        };

        let error = create_signature_with(&source, &destination, &options, &distributor, &checksum)
            .expect_err("cancelled");

        assert!(matches!(
            error,
            SignatureError::Cancelled {
                processed: 10,
                total: 100
            }
        ));
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert_eq!(checksum.calls.load(Ordering::Relaxed), 10);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn every_block_checksummed_once(threads in 1usize..=16, len in 0usize..=6_000, block in 1u64..=97) {
            run_with_workers(threads, &patterned(len), block, None);
        }
    }
}
