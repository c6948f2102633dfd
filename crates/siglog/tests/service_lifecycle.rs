//! Integration tests for the running service.
//!
//! These tests start a real instance with both coordinators and drive it
//! through the in-process triggers and, on Linux, through real signals.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use siglog::{LogLevel, Siglog, SiglogConfig, post_dump, post_level};
use test_support::{dump_files, scratch_dir, serial, wait_until};

const TIMEOUT: Duration = Duration::from_secs(5);

fn start(dir: &Path, level: LogLevel) -> Siglog {
    let config = SiglogConfig::builder()
        .start_level(level)
        .directory(dir)
        .build();
    Siglog::initialize(config).expect("initialize")
}

fn log_messages(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("logs"))
        .expect("log readable")
        .lines()
        .map(|line| line.splitn(3, " | ").nth(2).expect("message").to_owned())
        .collect()
}

// ============================================================================
// Level Changes
// ============================================================================

/// The final level is the last valid payload; invalid payloads change nothing.
#[test]
fn level_follows_valid_payloads_only() {
    let _guard = serial();
    let temp = scratch_dir();
    let service = start(temp.path(), LogLevel::Standard);

    post_level(1);
    assert!(wait_until(TIMEOUT, || service.level() == LogLevel::Min));

    post_level(7);
    post_level(-3);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(service.level(), LogLevel::Min);

    post_level(3);
    assert!(wait_until(TIMEOUT, || service.level() == LogLevel::Max));

    post_level(0);
    assert!(wait_until(TIMEOUT, || service.level() == LogLevel::Disabled));
}

/// Raising the level through the mailbox admits more verbose messages.
#[test]
fn level_change_affects_later_messages() {
    let _guard = serial();
    let temp = scratch_dir();
    let mut service = start(temp.path(), LogLevel::Standard);

    service.max(format_args!("a")).expect("log");
    service.min(format_args!("b")).expect("log");
    service.standard(format_args!("c")).expect("log");

    post_level(LogLevel::Max.as_i32());
    assert!(wait_until(TIMEOUT, || service.level() == LogLevel::Max));
    service.max(format_args!("d")).expect("log");
    service.teardown();

    assert_eq!(log_messages(temp.path()), ["b", "c", "d"]);
}

/// Concurrent writers keep whole lines while the level flips underneath.
#[test]
fn concurrent_logging_during_level_changes() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 100;

    let _guard = serial();
    let temp = scratch_dir();
    let service = Arc::new(start(temp.path(), LogLevel::Max));

    let writers: Vec<_> = (0..THREADS)
        .map(|index| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for n in 0..PER_THREAD {
                    service.min(format_args!("w{index} {n} done")).expect("log");
                }
            })
        })
        .collect();
    for payload in [2, 3, 1, 3] {
        post_level(payload);
        thread::sleep(Duration::from_millis(1));
    }
    for writer in writers {
        writer.join().expect("writer");
    }

    let messages = log_messages(temp.path());
    assert_eq!(messages.len(), THREADS * PER_THREAD);
    assert!(messages.iter().all(|message| message.ends_with(" done")));
}

// ============================================================================
// Dumps
// ============================================================================

/// `K` requests yield `K` distinct dump files.
#[test]
fn every_dump_request_writes_a_file() {
    const REQUESTS: usize = 5;

    let _guard = serial();
    let temp = scratch_dir();
    let mut service = start(temp.path(), LogLevel::Standard);

    for _ in 0..REQUESTS {
        post_dump();
    }
    assert!(wait_until(TIMEOUT, || dump_files(temp.path()).len() == REQUESTS));
    service.teardown();

    let files = dump_files(temp.path());
    assert_eq!(files.len(), REQUESTS);
    for name in &files {
        let text = fs::read_to_string(temp.path().join(name)).expect("read");
        assert_eq!(text, format!("{name}\n---------------------\n"));
    }
}

/// One producer writing `"x: 1\n"` yields the header followed by that text.
#[test]
fn producer_output_lands_in_the_dump() {
    let _guard = serial();
    let temp = scratch_dir();
    let mut service = start(temp.path(), LogLevel::Standard);
    service
        .register_producer(|sink| sink.write_all(b"x: 1\n"))
        .expect("register");

    post_dump();
    assert!(wait_until(TIMEOUT, || dump_files(temp.path()).len() == 1));
    service.teardown();

    let name = &dump_files(temp.path())[0];
    assert!(name.starts_with("DUMP-"));
    let text = fs::read_to_string(temp.path().join(name)).expect("read");
    assert_eq!(text, format!("{name}\n---------------------\nx: 1\n"));
}

/// A producer that panics spoils its own dump but not the requests after it.
#[test]
fn panicking_producer_keeps_the_dump_coordinator_alive() {
    let _guard = serial();
    let temp = scratch_dir();
    let mut service = start(temp.path(), LogLevel::Standard);
    service
        .register_producer(|_| panic!("producer failure"))
        .expect("register");

    post_dump();
    assert!(wait_until(TIMEOUT, || dump_files(temp.path()).len() == 1));

    post_dump();
    post_dump();
    assert!(wait_until(TIMEOUT, || dump_files(temp.path()).len() == 3));
    service.teardown();

    for name in dump_files(temp.path()) {
        let text = fs::read_to_string(temp.path().join(&name)).expect("read");
        assert!(text.starts_with(&format!("{name}\n---------------------\n")));
    }
}

/// Watchpoints render the value current at dump time, in registration order.
#[test]
fn watchpoints_render_current_values() {
    static ACTIVE: AtomicI32 = AtomicI32::new(0);
    static SERVED: AtomicU64 = AtomicU64::new(0);
    static LATENCY: AtomicU64 = AtomicU64::new(0);

    let _guard = serial();
    let temp = scratch_dir();
    let mut service = start(temp.path(), LogLevel::Standard);
    service.watch_i32("active", &ACTIVE).expect("register");
    service.watch_u64("served", &SERVED).expect("register");
    service.watch_f64("latency", &LATENCY).expect("register");

    ACTIVE.store(-2, Ordering::Relaxed);
    SERVED.store(1_000, Ordering::Relaxed);
    LATENCY.store(0.5_f64.to_bits(), Ordering::Relaxed);

    post_dump();
    assert!(wait_until(TIMEOUT, || dump_files(temp.path()).len() == 1));
    service.teardown();

    let name = &dump_files(temp.path())[0];
    let text = fs::read_to_string(temp.path().join(name)).expect("read");
    let body: Vec<&str> = text.lines().skip(2).collect();
    assert_eq!(body, ["active: -2", "served: 1000", "latency: 0.500000"]);
}

// ============================================================================
// Signals
// ============================================================================

/// Real signals drive both coordinators.
#[cfg(target_os = "linux")]
#[test]
fn real_signals_change_level_and_dump() {
    let _guard = serial();
    let temp = scratch_dir();
    let mut service = start(temp.path(), LogLevel::Standard);
    let (level_signal, dump_signal) = service.signals().expect("bound");
    let pid = signal::current_pid();

    signal::queue(pid, level_signal, LogLevel::Min.as_i32()).expect("sigqueue");
    assert!(wait_until(TIMEOUT, || service.level() == LogLevel::Min));

    signal::queue(pid, level_signal, 42).expect("sigqueue");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(service.level(), LogLevel::Min);

    signal::raise_dump(pid, dump_signal).expect("kill");
    assert!(wait_until(TIMEOUT, || dump_files(temp.path()).len() == 1));
    service.teardown();
}

// ============================================================================
// Teardown
// ============================================================================

/// Dropping the handle tears the service down and frees the instance slot.
#[test]
fn drop_tears_down() {
    let _guard = serial();
    let temp = scratch_dir();
    {
        let _service = start(temp.path(), LogLevel::Standard);
    }
    let service = start(temp.path(), LogLevel::Standard);
    assert!(service.is_active());
}

/// Requests posted after teardown are not served and do not fault.
#[test]
fn triggers_after_teardown_are_harmless() {
    let _guard = serial();
    let temp = scratch_dir();
    let mut service = start(temp.path(), LogLevel::Standard);
    service.teardown();

    post_dump();
    post_level(3);
    thread::sleep(Duration::from_millis(50));
    assert!(dump_files(temp.path()).is_empty());
    assert_eq!(service.level(), LogLevel::Standard);
}
