//! Integration tests for log level filtering.
//!
//! These tests verify that the writer's threshold decides which lines reach
//! the log file, including threshold changes between writes.

use std::fs;
use std::path::Path;

use logging::{LogLevel, LogWriter, log_path};

fn messages(dir: &Path) -> Vec<String> {
    fs::read_to_string(log_path(Some(dir)))
        .expect("log readable")
        .lines()
        .map(|line| {
            line.splitn(3, " | ")
                .nth(2)
                .expect("three columns")
                .to_owned()
        })
        .collect()
}

// ============================================================================
// Threshold Table
// ============================================================================

/// Every (threshold, message level) pair writes iff the canonical rule holds.
#[test]
fn every_threshold_and_level_pair_follows_the_rule() {
    for threshold in LogLevel::ALL {
        let temp = tempfile::tempdir().expect("tempdir");
        let writer = LogWriter::open(Some(temp.path()), threshold).expect("open");

        for level in LogLevel::ALL {
            writer
                .write(level, format_args!("{}", level.name()))
                .expect("write");
        }

        let expected: Vec<String> = LogLevel::ALL
            .into_iter()
            .filter(|level| {
                threshold != LogLevel::Disabled && *level != LogLevel::Disabled && *level <= threshold
            })
            .map(|level| level.name().to_owned())
            .collect();
        assert_eq!(messages(temp.path()), expected, "threshold {threshold}");
    }
}

/// With `Standard`, `Max` is dropped and `Min`/`Standard` are kept.
#[test]
fn standard_scenario() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = LogWriter::open(Some(temp.path()), LogLevel::Standard).expect("open");

    writer.write(LogLevel::Max, format_args!("a")).expect("write");
    writer.write(LogLevel::Min, format_args!("b")).expect("write");
    writer.write(LogLevel::Standard, format_args!("c")).expect("write");

    assert_eq!(messages(temp.path()), ["b", "c"]);
}

// ============================================================================
// Threshold Changes
// ============================================================================

/// Raising the threshold admits previously filtered levels.
#[test]
fn raising_threshold_admits_more() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = LogWriter::open(Some(temp.path()), LogLevel::Min).expect("open");

    writer.write(LogLevel::Max, format_args!("early")).expect("write");
    writer.set_level(LogLevel::Max);
    writer.write(LogLevel::Max, format_args!("late")).expect("write");

    assert_eq!(messages(temp.path()), ["late"]);
}

/// Disabling and re-enabling resumes output without losing the file.
#[test]
fn disabling_and_reenabling_resumes_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");

    writer.write(LogLevel::Min, format_args!("one")).expect("write");
    writer.set_level(LogLevel::Disabled);
    writer.write(LogLevel::Min, format_args!("two")).expect("write");
    writer.set_level(LogLevel::Min);
    writer.write(LogLevel::Min, format_args!("three")).expect("write");

    assert_eq!(messages(temp.path()), ["one", "three"]);
}
