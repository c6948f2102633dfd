#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` owns the verbosity scale and the log file writer used by the
//! signal-driven logging service. It knows nothing about signals or worker
//! threads; the service crate decides when the threshold changes and this
//! crate decides which lines reach disk.
//!
//! # Design
//!
//! [`LogLevel`] is a totally ordered enumeration with a distinguished
//! [`LogLevel::Disabled`] value below every verbose level. [`LogWriter`] keeps
//! the threshold and the append handle behind one mutex so a level change and
//! a concurrent write are always observed in a consistent order.
//!
//! # Invariants
//!
//! - A line is written iff the threshold admits the message level
//!   ([`LogLevel::admits`]).
//! - Each accepted line is rendered up front, written with a single
//!   `write_all`, and flushed before the call returns.
//! - A writer without a file never faults; it simply writes nothing.
//!
//! # Errors
//!
//! [`LogWriter::write`] surfaces [`std::io::Error`] values from the underlying
//! file unchanged. [`LevelParseError`] reports payloads or strings that do not
//! name a level.
//!
//! # Examples
//!
//! ```
//! use logging::{LogLevel, LogWriter};
//!
//! let dir = tempfile::tempdir()?;
//! let writer = LogWriter::open(Some(dir.path()), LogLevel::Standard)?;
//!
//! assert!(writer.write(LogLevel::Min, format_args!("kept {}", 1))?);
//! assert!(!writer.write(LogLevel::Max, format_args!("filtered"))?);
//!
//! let text = std::fs::read_to_string(dir.path().join("logs"))?;
//! assert!(text.ends_with("| MIN      | kept 1\n"));
//! # Ok::<(), std::io::Error>(())
//! ```

mod levels;
pub mod timestamp;
mod writer;

pub use levels::{LevelParseError, LogLevel};
pub use writer::{LEVEL_COLUMN_WIDTH, LOG_FILE_NAME, LogWriter, log_path, render_line};
