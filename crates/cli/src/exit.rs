//! crates/cli/src/exit.rs
//!
//! Process exit statuses.

use signature::ErrorKind;

/// Largest status a process can report portably.
const MAX_EXIT_CODE: i32 = 255;

/// Exit status reported by the `blocksig` binary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExitStatus {
    /// The requested operation completed.
    Success,
    /// The command line or an input value was rejected.
    Usage,
    /// A source or destination path failed validation.
    Path,
    /// An operating-system call failed.
    Io,
    /// An internal invariant was violated while workers were running.
    ConcurrencyFault,
    /// The operation was cancelled.
    Cancelled,
    /// An unexpected failure, such as a panic, was caught at the boundary.
    Internal,
}

impl ExitStatus {
    /// Numeric status passed to the operating system.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Usage => 1,
            Self::Path => 2,
            Self::Io => 3,
            Self::ConcurrencyFault => 4,
            Self::Cancelled => 5,
            Self::Internal => 6,
        }
    }

    /// Status for a failed signature operation.
    #[must_use]
    pub const fn from_error_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Path => Self::Path,
            ErrorKind::Io => Self::Io,
            ErrorKind::ConcurrencyFault => Self::ConcurrencyFault,
            ErrorKind::Cancelled => Self::Cancelled,
            ErrorKind::Invalid => Self::Usage,
        }
    }
}

impl From<ExitStatus> for i32 {
    fn from(status: ExitStatus) -> Self {
        status.code()
    }
}

/// Converts a numeric exit code into an [`std::process::ExitCode`].
///
/// Values outside `0..=255` are clamped.
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}
