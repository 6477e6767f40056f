//! crates/cli/src/help.rs
//!
//! Static help, usage and version text.

use crate::PROGRAM_NAME;

const HELP_TEXT: &str = concat!(
    "blocksig ",
    env!("CARGO_PKG_VERSION"),
    "\n",
    "Compute a block-granular CRC-32 signature of a file.\n",
    "\n",
    "Usage: blocksig [OPTIONS] SOURCE DESTINATION [BLOCK_SIZE_MIB]\n",
    "       blocksig --compare OLD_SIGNATURE NEW_SIGNATURE\n",
    "\n",
    "The signature is a flat array of little-endian 32-bit checksums, one per\n",
    "block, with no header. Producer and consumer must use the same block size.\n",
    "The default block size is 2048 bytes.\n",
    "\n",
    "Options:\n",
    "      --block-size-bytes BYTES  Block size in bytes, for sizes that are not whole MiB.\n",
    "  -j, --threads N               Number of worker threads (default: hardware parallelism).\n",
    "      --compare                 Compare two signature files instead of generating one.\n",
    "  -v, --verbose                 Increase verbosity; may be supplied multiple times.\n",
    "  -h, --help                    Show this help message and exit.\n",
    "  -V, --version                 Output version information and exit.\n",
    "\n",
    "Environment:\n",
    "  BLOCKSIG_LOG                  Log filter directive, e.g. 'signature=trace'.\n",
    "\n",
    "Exit status:\n",
    "  0 success, 1 usage error, 2 invalid path, 3 I/O error,\n",
    "  4 internal concurrency fault, 5 cancelled, 6 unexpected internal error.\n",
);

/// Returns the full help text.
pub(crate) fn render_help() -> &'static str {
    HELP_TEXT
}

/// Returns the one-line version banner.
pub(crate) fn render_version() -> String {
    format!("{PROGRAM_NAME} {}\n", env!("CARGO_PKG_VERSION"))
}

/// Returns the short usage hint printed after argument errors.
pub(crate) fn render_usage() -> String {
    format!(
        "Usage: {PROGRAM_NAME} [OPTIONS] SOURCE DESTINATION [BLOCK_SIZE_MIB]\n\
         Try '{PROGRAM_NAME} --help' for more information.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_mentions_every_option() {
        let help = render_help();
        for option in [
            "--block-size-bytes",
            "--threads",
            "--compare",
            "--verbose",
            "--help",
            "--version",
        ] {
            assert!(help.contains(option), "help is missing {option}");
        }
    }

    #[test]
    fn version_banner_is_single_line() {
        let banner = render_version();
        assert!(banner.starts_with("blocksig "));
        assert_eq!(banner.lines().count(), 1);
    }
}
