//! Service configuration and its builder.
//!
//! A [`SiglogConfig`] names the two trigger signals, the starting threshold
//! and the directory holding the log and dump files. Unset signals resolve to
//! the platform defaults when the service starts.

use std::env;
use std::path::{Path, PathBuf};

use logging::{LevelParseError, LogLevel};

/// Environment variable selecting the level signal.
pub const ENV_LEVEL_SIGNAL: &str = "SIGLOG_LEVEL_SIGNAL";
/// Environment variable selecting the dump signal.
pub const ENV_DUMP_SIGNAL: &str = "SIGLOG_DUMP_SIGNAL";
/// Environment variable selecting the starting level.
pub const ENV_LEVEL: &str = "SIGLOG_LEVEL";
/// Environment variable selecting the output directory.
pub const ENV_DIR: &str = "SIGLOG_DIR";

/// Error returned when configuration input is malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A signal variable is not an integer.
    #[error("{variable} must be a signal number, got {value:?}")]
    InvalidSignal {
        /// Variable that held the value.
        variable: &'static str,
        /// Offending text.
        value: String,
    },
    /// The level variable does not name a level.
    #[error("{variable} is invalid: {source}")]
    InvalidLevel {
        /// Variable that held the value.
        variable: &'static str,
        /// Parse failure.
        #[source]
        source: LevelParseError,
    },
}

/// Parameters for [`Siglog::initialize`](crate::Siglog::initialize).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SiglogConfig {
    level_signal: Option<i32>,
    dump_signal: Option<i32>,
    start_level: LogLevel,
    directory: Option<PathBuf>,
}

impl SiglogConfig {
    /// Creates a new [`SiglogConfigBuilder`].
    #[must_use]
    pub fn builder() -> SiglogConfigBuilder {
        SiglogConfigBuilder::default()
    }

    /// Builds a configuration from the `SIGLOG_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|variable| {
            env::var_os(variable).map(|value| value.to_string_lossy().into_owned())
        })
    }

    /// Builds a configuration from `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(signal) = parse_signal(&lookup, ENV_LEVEL_SIGNAL)? {
            builder = builder.level_signal(signal);
        }
        if let Some(signal) = parse_signal(&lookup, ENV_DUMP_SIGNAL)? {
            builder = builder.dump_signal(signal);
        }
        if let Some(text) = lookup(ENV_LEVEL) {
            let level = text
                .parse::<LogLevel>()
                .map_err(|source| ConfigError::InvalidLevel {
                    variable: ENV_LEVEL,
                    source,
                })?;
            builder = builder.start_level(level);
        }
        if let Some(dir) = lookup(ENV_DIR).filter(|dir| !dir.is_empty()) {
            builder = builder.directory(dir);
        }
        Ok(builder.build())
    }

    /// Explicit level signal, if one was chosen.
    #[must_use]
    pub const fn level_signal(&self) -> Option<i32> {
        self.level_signal
    }

    /// Explicit dump signal, if one was chosen.
    #[must_use]
    pub const fn dump_signal(&self) -> Option<i32> {
        self.dump_signal
    }

    /// Threshold in effect when the service starts.
    #[must_use]
    pub const fn start_level(&self) -> LogLevel {
        self.start_level
    }

    /// Directory holding the log and dump files; `None` is the working
    /// directory.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Returns `(level_signal, dump_signal)` with defaults filled in.
    ///
    /// The level signal defaults to `SIGRTMIN` (or `SIGUSR1` without real-time
    /// signals) and the dump signal to the one after the level signal.
    #[must_use]
    pub fn resolved_signals(&self) -> (i32, i32) {
        let level = self
            .level_signal
            .unwrap_or_else(signal::default_level_signal);
        let dump = self
            .dump_signal
            .unwrap_or_else(|| signal::default_dump_signal(level));
        (level, dump)
    }
}

fn parse_signal<F>(lookup: &F, variable: &'static str) -> Result<Option<i32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(text) = lookup(variable) else {
        return Ok(None);
    };
    text.trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidSignal { variable, value: text })
}

/// Builder used to assemble a [`SiglogConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SiglogConfigBuilder {
    level_signal: Option<i32>,
    dump_signal: Option<i32>,
    start_level: LogLevel,
    directory: Option<PathBuf>,
}

impl SiglogConfigBuilder {
    /// Selects the level signal. Negative numbers select the default.
    #[must_use]
    pub fn level_signal(mut self, signal: i32) -> Self {
        self.level_signal = (signal >= 0).then_some(signal);
        self
    }

    /// Selects the dump signal. Negative numbers select the default.
    #[must_use]
    pub fn dump_signal(mut self, signal: i32) -> Self {
        self.dump_signal = (signal >= 0).then_some(signal);
        self
    }

    /// Sets the starting threshold.
    #[must_use]
    pub fn start_level(mut self, level: LogLevel) -> Self {
        self.start_level = level;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Finalises the builder and constructs the [`SiglogConfig`].
    #[must_use]
    pub fn build(self) -> SiglogConfig {
        SiglogConfig {
            level_signal: self.level_signal,
            dump_signal: self.dump_signal,
            start_level: self.start_level,
            directory: self.directory,
        }
    }
}
