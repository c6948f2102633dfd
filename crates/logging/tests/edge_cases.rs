//! Integration tests for log writer edge cases.
//!
//! These tests cover line layout, empty and unicode messages, and concurrent
//! writers sharing one file.

use std::fs;
use std::sync::Arc;
use std::thread;

use logging::{LogLevel, LogWriter, log_path};

// ============================================================================
// Line Layout
// ============================================================================

/// Verifies the `MM/DD/YY HH:MM:SS | LEVEL    | message` layout.
#[test]
fn line_layout_has_three_columns() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");
    writer
        .write(LogLevel::Standard, format_args!("Hello there {}", 4))
        .expect("write");

    let contents = fs::read_to_string(log_path(Some(temp.path()))).expect("read");
    let line = contents.strip_suffix('\n').expect("newline terminated");
    let (stamp, rest) = line.split_at(17);

    let bytes = stamp.as_bytes();
    assert_eq!(bytes[2], b'/');
    assert_eq!(bytes[5], b'/');
    assert_eq!(bytes[8], b' ');
    assert_eq!(bytes[11], b':');
    assert_eq!(bytes[14], b':');
    assert!(stamp.chars().filter(char::is_ascii_digit).count() == 12);
    assert_eq!(rest, " | STANDARD | Hello there 4");
}

/// Short level names are padded to eight columns.
#[test]
fn short_level_names_are_padded() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");
    writer.write(LogLevel::Max, format_args!("m")).expect("write");

    let contents = fs::read_to_string(log_path(Some(temp.path()))).expect("read");
    assert!(contents.ends_with(" | MAX      | m\n"));
}

// ============================================================================
// Message Content
// ============================================================================

/// Empty messages still produce a full line.
#[test]
fn empty_message_writes_a_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");
    writer.write(LogLevel::Min, format_args!("")).expect("write");

    let contents = fs::read_to_string(log_path(Some(temp.path()))).expect("read");
    assert!(contents.ends_with(" | MIN      | \n"));
}

/// Unicode survives unchanged.
#[test]
fn unicode_message_is_preserved() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open");
    writer
        .write(LogLevel::Min, format_args!("Zmienna {}: żółć", 1))
        .expect("write");

    let contents = fs::read_to_string(log_path(Some(temp.path()))).expect("read");
    assert!(contents.contains("Zmienna 1: żółć"));
}

// ============================================================================
// Concurrency
// ============================================================================

/// Lines from concurrent writers never interleave.
#[test]
fn concurrent_writers_produce_whole_lines() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;

    let temp = tempfile::tempdir().expect("tempdir");
    let writer = Arc::new(LogWriter::open(Some(temp.path()), LogLevel::Max).expect("open"));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_index| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    writer
                        .write(LogLevel::Min, format_args!("t{thread_index} n{i} end"))
                        .expect("write");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }

    let contents = fs::read_to_string(log_path(Some(temp.path()))).expect("read");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    assert!(lines.iter().all(|line| line.ends_with(" end")));
}
