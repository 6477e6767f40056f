#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the command-line front-end of `blocksig`. It recognises
//! `SOURCE DESTINATION [BLOCK_SIZE_MIB]` operands together with
//! `--block-size-bytes`, `--threads`/`-j`, `--compare`, `--verbose`/`-v`,
//! `--help`/`-h` and `--version`/`-V`, and delegates the work to the
//! [`signature`] crate.
//!
//! # Design
//!
//! [`run`] is the primary entry point. It accepts an iterator of arguments
//! together with handles for standard output and error so the whole
//! front-end can be exercised in-process. A [`clap`](https://docs.rs/clap/)
//! command performs the parse; operands are then resolved into either a
//! generation or a comparison request. Failures are rendered on the error
//! handle prefixed with `blocksig error:` and mapped to an [`ExitStatus`].
//!
//! # Invariants
//!
//! - `run` never unwinds; a panic inside the engine is caught and reported as
//!   [`ExitStatus::Internal`].
//! - Successful generation prints nothing unless `-v` is given.
//!
//! # Examples
//!
//! ```
//! use cli::run;
//!
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let exit_code = run(["blocksig", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(exit_code, 0);
//! assert!(!stdout.is_empty());
//! assert!(stderr.is_empty());
//! ```

use std::ffi::OsString;
use std::io::Write;

mod arguments;
mod execution;
mod exit;
mod help;

pub use arguments::ParseError;
pub use exit::{ExitStatus, exit_code_from};

/// Name used in diagnostics and the version banner.
pub const PROGRAM_NAME: &str = "blocksig";

/// Parses `arguments`, runs the requested action and returns the exit code.
///
/// The first argument is the program name, as with [`std::env::args_os`].
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    match arguments::parse_args(arguments) {
        Ok(parsed) => execution::execute(parsed, stdout, stderr),
        Err(error) => execution::report_parse_error(&error, stderr),
    }
}
