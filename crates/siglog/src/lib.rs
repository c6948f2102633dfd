#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `siglog` is a logging service embedded in a long-running process whose
//! verbosity can be changed, and whose state can be dumped to a file, from
//! outside the process by sending it signals. Nothing has to be restarted and
//! the host program's control flow is never interrupted.
//!
//! # Design
//!
//! The service is a deferred-execution engine. Signal handlers (see the
//! `signal` crate) only store a payload in an atomic mailbox and ring a
//! self-pipe doorbell. Two coordinator threads do the real work:
//!
//! - the level coordinator (`siglog-level`) validates the latest payload and
//!   applies it to the log writer;
//! - the dump coordinator (`siglog-dump`) writes one `DUMP-MM.DD.YY-HH:MM:SS`
//!   file per request, rendering every registered producer and watchpoint.
//!
//! [`Siglog`] owns the whole arrangement. [`Siglog::initialize`] acquires the
//! log file, the dump registry, the doorbells, the coordinators and the signal
//! bindings in that order; [`Siglog::teardown`] releases them in reverse.
//! The [`global`] module holds an optional process-wide instance used by the
//! [`log!`], [`min!`], [`standard!`] and [`max!`] macros.
//!
//! # Invariants
//!
//! - A message at level `L` is written while the threshold is `C` iff neither
//!   is [`LogLevel::Disabled`] and `L <= C`.
//! - The final threshold equals the last valid level payload; invalid
//!   payloads are ignored.
//! - `k` dump requests produce `k` dump files with distinct names.
//! - The log lock and the registry lock are never held together.
//!
//! # Errors
//!
//! [`InitError`] describes why the service could not start. Registration
//! fails with [`CapacityError`] when the registry cannot grow. Logging
//! surfaces [`std::io::Error`] from the log file; the macros report such
//! errors through `tracing` and carry on.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use siglog::{LogLevel, Siglog, SiglogConfig};
//!
//! static REQUESTS: AtomicU64 = AtomicU64::new(0);
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Siglog::initialize(SiglogConfig::builder().directory("/var/tmp").build())?;
//! service.watch_u64("requests", &REQUESTS)?;
//!
//! REQUESTS.fetch_add(1, Ordering::Relaxed);
//! service.log(LogLevel::Min, format_args!("handled request {}", 1))?;
//!
//! // `kill -s <SIGRTMIN+1> <pid>` now writes /var/tmp/DUMP-... with
//! // "requests: 1" in it.
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod error;
pub mod global;
mod lifecycle;

pub use config::{
    ConfigError, ENV_DIR, ENV_DUMP_SIGNAL, ENV_LEVEL, ENV_LEVEL_SIGNAL, SiglogConfig,
    SiglogConfigBuilder,
};
pub use dump::{CapacityError, DumpEntry, ValueType, Watchpoint};
pub use error::InitError;
pub use lifecycle::Siglog;
pub use logging::{LevelParseError, LogLevel};
pub use signal::{post_dump, post_level};

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}

/// Logs through the process-wide instance at the given level.
///
/// Does nothing when [`global::init`] has not been called. Write errors are
/// reported through `tracing` and otherwise ignored.
///
/// ```
/// siglog::log!(siglog::LogLevel::Standard, "cache warmed in {} ms", 12);
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {
        if let ::std::result::Result::Err(error) =
            $crate::global::log($level, ::std::format_args!($($arg)+))
        {
            $crate::__private::tracing::warn!(%error, "failed to write log line");
        }
    };
}

/// Logs at [`LogLevel::Min`] through the process-wide instance.
#[macro_export]
macro_rules! min {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Min, $($arg)+)
    };
}

/// Logs at [`LogLevel::Standard`] through the process-wide instance.
#[macro_export]
macro_rules! standard {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Standard, $($arg)+)
    };
}

/// Logs at [`LogLevel::Max`] through the process-wide instance.
#[macro_export]
macro_rules! max {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Max, $($arg)+)
    };
}
