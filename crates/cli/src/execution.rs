//! crates/cli/src/execution.rs
//!
//! Runs a parsed invocation and renders its outcome.

use std::any::Any;
use std::fmt::Display;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use signature::{
    SignatureDiff, SignatureError, SignatureOptions, SignatureSummary, compare_signatures,
    create_signature, read_signature,
};
#[cfg(feature = "tracing")]
use tracing::debug;

use crate::PROGRAM_NAME;
use crate::arguments::{Action, ParseError, ParsedArgs};
use crate::exit::ExitStatus;
use crate::help::{render_help, render_usage, render_version};

/// Result of a completed action, rendered after the engine returns.
enum Outcome {
    Generated {
        destination: PathBuf,
        summary: SignatureSummary,
    },
    Compared {
        old: PathBuf,
        new: PathBuf,
        diff: SignatureDiff,
    },
}

pub(crate) fn execute<Out, Err>(parsed: ParsedArgs, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    if parsed.show_help {
        return finish_output(stdout.write_all(render_help().as_bytes()), stderr);
    }
    if parsed.show_version {
        return finish_output(stdout.write_all(render_version().as_bytes()), stderr);
    }

    let verbosity = parsed.verbosity;
    let action = match parsed.into_action() {
        Ok(action) => action,
        Err(error) => return report_parse_error(&error, stderr),
    };

    #[cfg(feature = "tracing")]
    {
        // A subscriber may already be installed when embedded or under test.
        let _ = logging::init_tracing(logging::VerbosityConfig::from_verbose_level(verbosity));
        debug!(?action, "dispatching");
    }

    match panic::catch_unwind(AssertUnwindSafe(|| perform(action))) {
        Ok(Ok(outcome)) => {
            let rendered = render_outcome(&outcome, verbosity, stdout);
            finish_output(rendered, stderr)
        }
        Ok(Err(error)) => {
            report(stderr, &error);
            ExitStatus::from_error_kind(error.kind()).code()
        }
        Err(payload) => {
            report(stderr, format_args!("internal error: {}", panic_message(&*payload)));
            ExitStatus::Internal.code()
        }
    }
}

fn perform(action: Action) -> Result<Outcome, SignatureError> {
    match action {
        Action::Generate {
            source,
            destination,
            block_size,
            threads,
        } => {
            let mut builder = SignatureOptions::builder();
            if let Some(block_size) = block_size {
                builder = builder.block_size(block_size);
            }
            if let Some(threads) = threads {
                builder = builder.threads(threads);
            }
            let summary = create_signature(&source, &destination, &builder.build())?;
            Ok(Outcome::Generated {
                destination,
                summary,
            })
        }
        Action::Compare { old, new } => {
            let diff = compare_signatures(&read_signature(&old)?, &read_signature(&new)?);
            Ok(Outcome::Compared { old, new, diff })
        }
    }
}

fn render_outcome<W: Write>(outcome: &Outcome, verbosity: u8, out: &mut W) -> io::Result<()> {
    match outcome {
        Outcome::Generated {
            destination,
            summary,
        } => {
            if verbosity > 0 {
                writeln!(
                    out,
                    "{}: {} block(s) of {} bytes, {} signature bytes in {} window(s)",
                    destination.display(),
                    summary.block_count,
                    summary.block_size,
                    summary.signature_len,
                    summary.windows,
                )?;
            }
            Ok(())
        }
        Outcome::Compared { old, new, diff } => {
            let appended = diff.appended();
            let removed = diff.removed();
            writeln!(
                out,
                "{} -> {}: {} changed, {} appended, {} removed block(s)",
                old.display(),
                new.display(),
                diff.changed.len(),
                appended.end - appended.start,
                removed.end - removed.start,
            )?;
            for run in diff.changed_runs() {
                writeln!(out, "changed {}..{}", run.start, run.end)?;
            }
            if !appended.is_empty() {
                writeln!(out, "appended {}..{}", appended.start, appended.end)?;
            }
            if !removed.is_empty() {
                writeln!(out, "removed {}..{}", removed.start, removed.end)?;
            }
            if diff.is_identical() {
                writeln!(out, "identical")?;
            }
            Ok(())
        }
    }
}

/// Maps the result of writing to standard output onto an exit code.
fn finish_output<Err: Write>(result: io::Result<()>, stderr: &mut Err) -> i32 {
    match result {
        Ok(()) => ExitStatus::Success.code(),
        Err(error) => {
            report(stderr, format_args!("failed to write output: {error}"));
            ExitStatus::Io.code()
        }
    }
}

pub(crate) fn report_parse_error<Err: Write>(error: &ParseError, stderr: &mut Err) -> i32 {
    report(stderr, error);
    let _ = stderr.write_all(render_usage().as_bytes());
    ExitStatus::Usage.code()
}

fn report<Err: Write>(stderr: &mut Err, message: impl Display) {
    let _ = writeln!(stderr, "{PROGRAM_NAME} error: {message}");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
