//! crates/logging/src/writer.rs
//! Level-filtered, mutex-serialised persistence of log lines.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;

use crate::levels::LogLevel;
use crate::timestamp;

/// Name of the log file created inside the configured directory.
pub const LOG_FILE_NAME: &str = "logs";

/// Width the level name is padded to inside a log line.
pub const LEVEL_COLUMN_WIDTH: usize = 8;

/// Returns `<directory>/logs`, or `logs` relative to the working directory.
#[must_use]
pub fn log_path(directory: Option<&Path>) -> PathBuf {
    directory.map_or_else(|| PathBuf::from(LOG_FILE_NAME), |dir| dir.join(LOG_FILE_NAME))
}

/// Renders a complete log line including the trailing newline.
///
/// ```
/// use logging::{render_line, LogLevel};
/// use time::macros::datetime;
///
/// let line = render_line(
///     datetime!(2026-01-02 03:04:05 UTC),
///     LogLevel::Min,
///     format_args!("hello {}", 4),
/// );
/// assert_eq!(line, "01/02/26 03:04:05 | MIN      | hello 4\n");
/// ```
#[must_use]
pub fn render_line(at: OffsetDateTime, level: LogLevel, message: fmt::Arguments<'_>) -> String {
    format!(
        "{} | {:<width$} | {}\n",
        timestamp::log_stamp(at),
        level,
        message,
        width = LEVEL_COLUMN_WIDTH
    )
}

#[derive(Debug)]
struct LogState {
    level: LogLevel,
    file: Option<File>,
}

/// Shared log state: the active threshold and the append handle.
///
/// A single mutex guards both fields. Every accepted line is written with one
/// `write_all` and flushed before the lock is released, so lines from
/// concurrent callers never interleave and are durable on return.
///
/// A writer without a file (never opened, or [`close`](Self::close)d) accepts
/// every call and writes nothing.
#[derive(Debug)]
pub struct LogWriter {
    state: Mutex<LogState>,
}

impl LogWriter {
    /// Creates a writer with no backing file.
    #[must_use]
    pub const fn closed(level: LogLevel) -> Self {
        Self {
            state: Mutex::new(LogState { level, file: None }),
        }
    }

    /// Opens `<directory>/logs` in append mode, creating it when missing.
    pub fn open(directory: Option<&Path>, level: LogLevel) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path(directory))?;
        Ok(Self {
            state: Mutex::new(LogState {
                level,
                file: Some(file),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current threshold.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.lock().level
    }

    /// Replaces the threshold and returns the previous one.
    pub fn set_level(&self, level: LogLevel) -> LogLevel {
        std::mem::replace(&mut self.lock().level, level)
    }

    /// Reports whether a file is attached.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().file.is_some()
    }

    /// Writes one line when `level` passes the current threshold.
    ///
    /// Returns `Ok(true)` when the line was persisted and `Ok(false)` when it
    /// was filtered out or no file is attached.
    pub fn write(&self, level: LogLevel, message: fmt::Arguments<'_>) -> io::Result<bool> {
        let mut state = self.lock();
        if !state.level.admits(level) {
            return Ok(false);
        }
        let Some(file) = state.file.as_mut() else {
            return Ok(false);
        };

        let line = render_line(timestamp::now(), level, message);
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(true)
    }

    /// Detaches and closes the file. Later writes become no-ops.
    pub fn close(&self) -> io::Result<()> {
        let file = self.lock().file.take();
        match file {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_log(dir: &Path) -> String {
        fs::read_to_string(log_path(Some(dir))).expect("log file readable")
    }

    #[test]
    fn log_path_defaults_to_working_directory() {
        assert_eq!(log_path(None), PathBuf::from("logs"));
        assert_eq!(
            log_path(Some(Path::new("/var/tmp"))),
            PathBuf::from("/var/tmp/logs")
        );
    }

    #[test]
    fn open_creates_the_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let writer = LogWriter::open(Some(temp.path()), LogLevel::Standard).expect("open");
        assert!(writer.is_open());
        assert!(log_path(Some(temp.path())).exists());
    }

    #[test]
    fn standard_threshold_filters_max() {
        let temp = tempfile::tempdir().expect("tempdir");
        let writer = LogWriter::open(Some(temp.path()), LogLevel::Standard).expect("open");

        assert!(!writer.write(LogLevel::Max, format_args!("a")).expect("write"));
        assert!(writer.write(LogLevel::Min, format_args!("b")).expect("write"));
        assert!(writer.write(LogLevel::Standard, format_args!("c")).expect("write"));

        let contents = read_log(temp.path());
        let messages: Vec<&str> = contents
            .lines()
            .map(|line| line.rsplit(" | ").next().expect("message column"))
            .collect();
        assert_eq!(messages, ["b", "c"]);
    }

    #[test]
    fn disabled_message_level_is_never_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");
        assert!(!writer.write(LogLevel::Disabled, format_args!("x")).expect("write"));
        assert!(read_log(temp.path()).is_empty());
    }

    #[test]
    fn disabled_threshold_suppresses_everything() {
        let temp = tempfile::tempdir().expect("tempdir");
        let writer = LogWriter::open(Some(temp.path()), LogLevel::Disabled).expect("open");
        for level in LogLevel::ALL {
            assert!(!writer.write(level, format_args!("x")).expect("write"));
        }
        assert!(read_log(temp.path()).is_empty());
    }

    #[test]
    fn set_level_returns_previous() {
        let writer = LogWriter::closed(LogLevel::Min);
        assert_eq!(writer.set_level(LogLevel::Max), LogLevel::Min);
        assert_eq!(writer.level(), LogLevel::Max);
    }

    #[test]
    fn closed_writer_is_a_no_op() {
        let writer = LogWriter::closed(LogLevel::Max);
        assert!(!writer.is_open());
        assert!(!writer.write(LogLevel::Min, format_args!("dropped")).expect("write"));
    }

    #[test]
    fn close_detaches_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");
        writer.write(LogLevel::Min, format_args!("before")).expect("write");
        writer.close().expect("close");
        assert!(!writer.write(LogLevel::Min, format_args!("after")).expect("write"));
        writer.close().expect("second close");

        let contents = read_log(temp.path());
        assert!(contents.contains("before"));
        assert!(!contents.contains("after"));
    }

    #[test]
    fn open_appends_to_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(log_path(Some(temp.path())), "existing\n").expect("seed");
        let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");
        writer.write(LogLevel::Max, format_args!("new")).expect("write");

        let contents = read_log(temp.path());
        assert!(contents.starts_with("existing\n"));
        assert!(contents.ends_with("| new\n"));
    }
}
