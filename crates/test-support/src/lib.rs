//! Shared helpers for tests across the workspace.
//!
//! Signal handlers, doorbells and the service instance are process-wide, so
//! tests that touch them take [`serial`] first.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serialises tests that touch process-wide state.
///
/// A test that panicked while holding the lock does not poison it for the
/// rest of the suite.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Polls `condition` every few milliseconds until it holds or `timeout`
/// passes. Returns the final result of `condition`.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return condition();
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Creates a scratch directory removed when the returned guard drops.
#[must_use]
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("create scratch directory")
}

/// Lists the `DUMP-*` files in `dir`, sorted by name.
#[must_use]
pub fn dump_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read scratch directory")
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("DUMP-"))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn wait_until_returns_once_condition_holds() {
        let calls = AtomicUsize::new(0);
        assert!(wait_until(Duration::from_secs(1), || {
            calls.fetch_add(1, Ordering::Relaxed) >= 2
        }));
        assert!(calls.load(Ordering::Relaxed) >= 3);
    }

    #[test]
    fn wait_until_gives_up_after_timeout() {
        assert!(!wait_until(Duration::from_millis(20), || false));
    }

    #[test]
    fn dump_files_filters_and_sorts() {
        let dir = scratch_dir();
        for name in ["DUMP-b", "logs", "DUMP-a", "other"] {
            std::fs::write(dir.path().join(name), "").expect("write");
        }
        assert_eq!(dump_files(dir.path()), ["DUMP-a", "DUMP-b"]);
    }
}
