//! crates/logging/src/config.rs
//! Verbosity configuration derived from the `-v` count.

use super::levels::{Component, ComponentLevels, LogLevel};

/// Environment variable holding a filter directive that overrides the
/// verbosity derived from the command line.
pub const LOG_ENV_VAR: &str = "BLOCKSIG_LOG";

/// Combined verbosity configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Level applied to targets outside the workspace.
    pub default: LogLevel,
    /// Per-component levels.
    pub components: ComponentLevels,
}

impl VerbosityConfig {
    /// Create a configuration from a verbose level (the number of `-v` flags).
    ///
    /// | level | engine | workers | cli   |
    /// |-------|--------|---------|-------|
    /// | 0     | warn   | warn    | warn  |
    /// | 1     | info   | warn    | info  |
    /// | 2     | debug  | debug   | info  |
    /// | 3     | trace  | debug   | debug |
    /// | 4+    | trace  | trace   | trace |
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();
        let levels = &mut config.components;

        match level {
            0 => {}
            1 => {
                levels.engine = LogLevel::Info;
                levels.cli = LogLevel::Info;
            }
            2 => {
                levels.engine = LogLevel::Debug;
                levels.workers = LogLevel::Debug;
                levels.cli = LogLevel::Info;
            }
            3 => {
                levels.engine = LogLevel::Trace;
                levels.workers = LogLevel::Debug;
                levels.cli = LogLevel::Debug;
            }
            _ => {
                levels.engine = LogLevel::Trace;
                levels.workers = LogLevel::Trace;
                levels.cli = LogLevel::Trace;
                config.default = LogLevel::Debug;
            }
        }

        config
    }

    /// Renders the configuration as a filter directive such as
    /// `warn,signature=info,fast_io=warn,cli=info`.
    #[must_use]
    pub fn directive(&self) -> String {
        let mut directive = String::from(self.default.as_str());
        for component in Component::ALL {
            directive.push(',');
            directive.push_str(component.target());
            directive.push('=');
            directive.push_str(self.components.get(component).as_str());
        }
        directive
    }

    /// Most verbose level enabled anywhere in the configuration.
    #[must_use]
    pub fn max_level(&self) -> LogLevel {
        Component::ALL
            .iter()
            .map(|&component| self.components.get(component))
            .fold(self.default, LogLevel::max)
    }
}
