use std::io;
use std::path::PathBuf;

use dump::CapacityError;

/// Error returned by [`Siglog::initialize`](crate::Siglog::initialize).
///
/// Whatever was acquired before the failure has been released by the time
/// the error is returned.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// Another instance is still live in this process.
    #[error("logging service is already initialized")]
    AlreadyInitialized,
    /// The log file could not be opened.
    #[error("failed to open log file {path}: {source}")]
    OpenLog {
        /// Path of the log file.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// The dump registry could not be allocated.
    #[error("failed to allocate dump registry: {0}")]
    Allocate(#[from] CapacityError),
    /// A coordinator doorbell could not be opened.
    #[error("failed to open {channel} doorbell: {source}")]
    Doorbell {
        /// Channel label.
        channel: &'static str,
        /// Underlying failure.
        source: io::Error,
    },
    /// A coordinator thread could not be started.
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        /// Thread name.
        thread: &'static str,
        /// Underlying failure.
        source: io::Error,
    },
    /// The signal handlers could not be installed.
    #[error("failed to bind signals {level_signal} and {dump_signal}: {source}")]
    Bind {
        /// Requested level signal.
        level_signal: i32,
        /// Requested dump signal.
        dump_signal: i32,
        /// Underlying failure.
        source: io::Error,
    },
}
