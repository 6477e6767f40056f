//! crates/cli/src/arguments.rs
//!
//! Command definition and operand parsing.

use std::ffi::{OsStr, OsString};
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, builder::OsStringValueParser};
use thiserror::Error;

use crate::PROGRAM_NAME;

/// Number of bytes in one mebibyte; the positional block size is in MiB.
const MIB: u64 = 1 << 20;

/// Errors raised while interpreting the command line.
#[derive(Debug, Error)]
pub enum ParseError {
    /// `clap` rejected the argument list.
    #[error("{}", clap_message(.0))]
    Clap(#[from] clap::Error),

    /// Fewer operands than the selected mode requires.
    #[error("missing operand: expected {expected}")]
    MissingOperands {
        /// Operand list the mode expects.
        expected: &'static str,
    },

    /// More operands than the selected mode accepts.
    #[error("unexpected operand '{}'", .0.to_string_lossy())]
    UnexpectedOperand(OsString),

    /// A block size was not a positive integer in range.
    #[error("invalid block size '{value}': {reason}")]
    InvalidBlockSize {
        /// The rejected text.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The thread count was not a positive integer.
    #[error("invalid thread count '{0}': expected a positive integer")]
    InvalidThreads(String),

    /// The block size was given both positionally and with a flag.
    #[error("block size given both as an operand and with --block-size-bytes")]
    ConflictingBlockSize,
}

/// `clap` renders its own `error: ` prefix; the front-end adds its own.
fn clap_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let trimmed = rendered.trim_end();
    trimmed
        .strip_prefix("error: ")
        .unwrap_or(trimmed)
        .to_owned()
}

/// Raw result of the `clap` pass.
#[derive(Debug, Default)]
pub(crate) struct ParsedArgs {
    pub(crate) show_help: bool,
    pub(crate) show_version: bool,
    pub(crate) verbosity: u8,
    pub(crate) compare: bool,
    pub(crate) threads: Option<OsString>,
    pub(crate) block_size_bytes: Option<OsString>,
    pub(crate) operands: Vec<OsString>,
}

/// What the invocation asks for once operands are resolved.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Action {
    /// Write the signature of `source` to `destination`.
    Generate {
        source: PathBuf,
        destination: PathBuf,
        block_size: Option<NonZeroU64>,
        threads: Option<NonZeroUsize>,
    },
    /// Compare two existing signature files.
    Compare { old: PathBuf, new: PathBuf },
}

/// Builds the `clap` command used for parsing.
pub(crate) fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg_required_else_help(false)
        .arg(
            Arg::new("help")
                .long("help")
                .short('h')
                .help("Show this help message and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase verbosity; may be supplied multiple times.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("block-size-bytes")
                .long("block-size-bytes")
                .value_name("BYTES")
                .help("Block size in bytes, for sizes that are not whole MiB.")
                .value_parser(OsStringValueParser::new())
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('j')
                .value_name("N")
                .help("Number of worker threads (default: hardware parallelism).")
                .value_parser(OsStringValueParser::new())
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("compare")
                .long("compare")
                .help("Compare two signature files instead of generating one.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("args")
                .value_name("OPERAND")
                .num_args(0..)
                .value_parser(OsStringValueParser::new())
                .action(ArgAction::Append),
        )
}

/// Parses command-line arguments into a [`ParsedArgs`] structure.
pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, ParseError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;

    let operands = matches
        .remove_many::<OsString>("args")
        .map(|values| values.collect())
        .unwrap_or_default();

    Ok(ParsedArgs {
        show_help: matches.get_flag("help"),
        show_version: matches.get_flag("version"),
        verbosity: matches.get_count("verbose"),
        compare: matches.get_flag("compare"),
        threads: matches.remove_one::<OsString>("threads"),
        block_size_bytes: matches.remove_one::<OsString>("block-size-bytes"),
        operands,
    })
}

impl ParsedArgs {
    /// Resolves operands and option values into an [`Action`].
    pub(crate) fn into_action(self) -> Result<Action, ParseError> {
        let mut operands = self.operands.into_iter();

        if self.compare {
            let (Some(old), Some(new)) = (operands.next(), operands.next()) else {
                return Err(ParseError::MissingOperands {
                    expected: "OLD_SIGNATURE NEW_SIGNATURE",
                });
            };
            if let Some(extra) = operands.next() {
                return Err(ParseError::UnexpectedOperand(extra));
            }
            return Ok(Action::Compare {
                old: old.into(),
                new: new.into(),
            });
        }

        let (Some(source), Some(destination)) = (operands.next(), operands.next()) else {
            return Err(ParseError::MissingOperands {
                expected: "SOURCE DESTINATION [BLOCK_SIZE_MIB]",
            });
        };
        let block_size_mib = operands.next();
        if let Some(extra) = operands.next() {
            return Err(ParseError::UnexpectedOperand(extra));
        }

        let block_size = match (block_size_mib, self.block_size_bytes) {
            (Some(_), Some(_)) => return Err(ParseError::ConflictingBlockSize),
            (Some(mib), None) => Some(parse_block_size(&mib, MIB)?),
            (None, Some(bytes)) => Some(parse_block_size(&bytes, 1)?),
            (None, None) => None,
        };
        let threads = self.threads.as_deref().map(parse_threads).transpose()?;

        Ok(Action::Generate {
            source: source.into(),
            destination: destination.into(),
            block_size,
            threads,
        })
    }
}

/// Parses a positive block size expressed in units of `unit` bytes.
pub(crate) fn parse_block_size(value: &OsStr, unit: u64) -> Result<NonZeroU64, ParseError> {
    let text = value.to_string_lossy();
    let invalid = |reason| ParseError::InvalidBlockSize {
        value: text.to_string(),
        reason,
    };

    let count: u64 = text
        .trim()
        .parse()
        .map_err(|_| invalid("expected a positive integer"))?;
    let bytes = count
        .checked_mul(unit)
        .ok_or_else(|| invalid("value is too large"))?;
    NonZeroU64::new(bytes).ok_or_else(|| invalid("must be at least 1"))
}

fn parse_threads(value: &OsStr) -> Result<NonZeroUsize, ParseError> {
    let text = value.to_string_lossy();
    text.trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| ParseError::InvalidThreads(text.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(args: &[&str]) -> Result<Action, ParseError> {
        parse_args(args.iter().copied())?.into_action()
    }

    #[test]
    fn positional_block_size_is_mebibytes() {
        let action = action(&["blocksig", "in.bin", "out.sig", "3"]).expect("parse");
        assert_eq!(
            action,
            Action::Generate {
                source: PathBuf::from("in.bin"),
                destination: PathBuf::from("out.sig"),
                block_size: NonZeroU64::new(3 * MIB),
                threads: None,
            }
        );
    }

    #[test]
    fn block_size_flag_is_bytes() {
        let action = action(&["blocksig", "--block-size-bytes", "512", "a", "b"]).expect("parse");
        assert!(matches!(
            action,
            Action::Generate { block_size: Some(size), .. } if size.get() == 512
        ));
    }

    #[test]
    fn block_size_defaults_to_library_choice() {
        let action = action(&["blocksig", "a", "b"]).expect("parse");
        assert!(matches!(action, Action::Generate { block_size: None, .. }));
    }

    #[test]
    fn both_block_size_forms_conflict() {
        let error = action(&["blocksig", "--block-size-bytes", "512", "a", "b", "1"])
            .expect_err("conflict");
        assert!(matches!(error, ParseError::ConflictingBlockSize));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let error = action(&["blocksig", "a", "b", "0"]).expect_err("zero");
        assert!(matches!(
            error,
            ParseError::InvalidBlockSize {
                reason: "must be at least 1",
                ..
            }
        ));
    }

    #[test]
    fn overflowing_block_size_is_rejected() {
        let huge = u64::MAX.to_string();
        let error = action(&["blocksig", "a", "b", &huge]).expect_err("overflow");
        assert!(matches!(
            error,
            ParseError::InvalidBlockSize {
                reason: "value is too large",
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_block_size_is_rejected() {
        let error = action(&["blocksig", "a", "b", "two"]).expect_err("text");
        assert_eq!(
            error.to_string(),
            "invalid block size 'two': expected a positive integer"
        );
    }

    #[test]
    fn missing_destination_is_reported() {
        let error = action(&["blocksig", "only-source"]).expect_err("missing");
        assert!(matches!(error, ParseError::MissingOperands { .. }));
    }

    #[test]
    fn extra_operand_is_reported() {
        let error = action(&["blocksig", "a", "b", "1", "extra"]).expect_err("extra");
        assert_eq!(error.to_string(), "unexpected operand 'extra'");
    }

    #[test]
    fn threads_must_be_positive() {
        let error = action(&["blocksig", "--threads", "0", "a", "b"]).expect_err("zero threads");
        assert!(matches!(error, ParseError::InvalidThreads(_)));

        let action = action(&["blocksig", "-j", "4", "a", "b"]).expect("parse");
        assert!(matches!(
            action,
            Action::Generate { threads: Some(n), .. } if n.get() == 4
        ));
    }

    #[test]
    fn compare_takes_two_signatures() {
        assert!(matches!(
            action(&["blocksig", "--compare", "old.sig"]),
            Err(ParseError::MissingOperands { .. })
        ));
        assert_eq!(
            action(&["blocksig", "--compare", "old.sig", "new.sig"]).expect("parse"),
            Action::Compare {
                old: PathBuf::from("old.sig"),
                new: PathBuf::from("new.sig"),
            }
        );
    }

    #[test]
    fn verbosity_counts_repeats() {
        let parsed = parse_args(["blocksig", "-vv", "--verbose", "a", "b"]).expect("parse");
        assert_eq!(parsed.verbosity, 3);
    }

    #[test]
    fn unknown_flag_is_a_clap_error_without_double_prefix() {
        let error = parse_args(["blocksig", "--frobnicate"]).expect_err("unknown flag");
        assert!(matches!(error, ParseError::Clap(_)));
        assert!(!error.to_string().starts_with("error:"));
    }
}
