//! Background workers that turn mailbox notifications into work.
//!
//! Each coordinator owns one thread blocked on its [`Doorbell`]. Stopping sets
//! a flag and rings the bell; the worker finishes what it is doing, sees the
//! flag on its next wake-up and exits. A panic inside one wake-up is logged
//! and the thread keeps serving.

pub(crate) mod dump;
pub(crate) mod level;

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use signal::Doorbell;

/// Stop flag shared between a [`Worker`] and its thread.
#[derive(Debug, Default)]
pub(crate) struct StopFlag(AtomicBool);

impl StopFlag {
    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Handle to a running coordinator thread. Dropping it stops and joins the
/// thread.
#[derive(Debug)]
pub(crate) struct Worker {
    name: &'static str,
    stop: Arc<StopFlag>,
    bell: Arc<Doorbell>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts a thread named `name` that calls `on_wake` after every ring
    /// until stopped.
    pub(crate) fn spawn<F>(name: &'static str, bell: Doorbell, mut on_wake: F) -> io::Result<Self>
    where
        F: FnMut(&StopFlag) + Send + 'static,
    {
        let stop = Arc::new(StopFlag::default());
        let bell = Arc::new(bell);
        let handle = {
            let stop = Arc::clone(&stop);
            let bell = Arc::clone(&bell);
            thread::Builder::new()
                .name(name.to_owned())
                .spawn(move || {
                    tracing::debug!(worker = name, "coordinator started");
                    loop {
                        if let Err(error) = bell.wait() {
                            tracing::warn!(worker = name, %error, "doorbell failed; coordinator exiting");
                            break;
                        }
                        if stop.is_set() {
                            break;
                        }
                        let woke = panic::catch_unwind(AssertUnwindSafe(|| on_wake(&stop)));
                        if woke.is_err() {
                            tracing::error!(worker = name, "coordinator task panicked; still serving");
                        }
                    }
                    tracing::debug!(worker = name, "coordinator stopped");
                })?
        };
        Ok(Self {
            name,
            stop,
            bell,
            handle: Some(handle),
        })
    }

    /// Asks the thread to exit and waits for it. Idempotent.
    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stop.set();
        self.bell.ring();
        if handle.join().is_err() {
            tracing::warn!(worker = self.name, "coordinator panicked");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
