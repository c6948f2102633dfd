//! crates/logging/src/timestamp.rs
//! Wall-clock stamps for log lines and dump file names.

use std::time::SystemTime;

use time::OffsetDateTime;
use time::macros::format_description;

/// Returns the current time in the local offset.
///
/// The local offset cannot always be determined once a process has spawned
/// threads; UTC is used in that case.
#[must_use]
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::from(SystemTime::now()))
}

/// Formats `at` as `MM/DD/YY HH:MM:SS` for the log line prefix.
#[must_use]
pub fn log_stamp(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[month]/[day]/[year repr:last_two] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "01/01/70 00:00:00".to_owned())
}

/// Formats `at` as `MM.DD.YY-HH:MM:SS` for dump file names.
#[must_use]
pub fn dump_stamp(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[month].[day].[year repr:last_two]-[hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "01.01.70-00:00:00".to_owned())
}
