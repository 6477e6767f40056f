//! crates/logging/src/levels.rs
//! Log level definitions and per-component level sets.

use std::fmt;

/// Severity threshold applied to one component.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    #[default]
    Warn,
    /// Phase boundaries and summaries.
    Info,
    /// Per-window progress.
    Debug,
    /// Per-block detail.
    Trace,
}

impl LogLevel {
    /// Directive spelling understood by `tracing-subscriber` filters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Components whose verbosity can be tuned independently.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Component {
    /// The signature driver and block processor.
    Engine,
    /// The worker pool and mapping primitives.
    Workers,
    /// The command-line front-end.
    Cli,
}

impl Component {
    /// All components, in directive order.
    pub const ALL: [Self; 3] = [Self::Engine, Self::Workers, Self::Cli];

    /// Tracing target prefix the component logs under.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Engine => "signature",
            Self::Workers => "fast_io",
            Self::Cli => "cli",
        }
    }
}

/// Level per component.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentLevels {
    /// Level for [`Component::Engine`].
    pub engine: LogLevel,
    /// Level for [`Component::Workers`].
    pub workers: LogLevel,
    /// Level for [`Component::Cli`].
    pub cli: LogLevel,
}

impl ComponentLevels {
    /// Returns the level configured for `component`.
    #[must_use]
    pub const fn get(&self, component: Component) -> LogLevel {
        match component {
            Component::Engine => self.engine,
            Component::Workers => self.workers,
            Component::Cli => self.cli,
        }
    }

    /// Overrides the level configured for `component`.
    pub fn set(&mut self, component: Component, level: LogLevel) {
        match component {
            Component::Engine => self.engine = level,
            Component::Workers => self.workers = level,
            Component::Cli => self.cli = level,
        }
    }
}
