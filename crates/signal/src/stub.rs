//! Doorbells and signal bindings for platforms without POSIX signals.
//!
//! The doorbell falls back to a condition variable, which is enough for
//! in-process triggers through [`post_level`](crate::post_level) and
//! [`post_dump`](crate::post_dump). Signal bindings install nothing.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use crate::mailbox::Channel;

struct Bell {
    open: AtomicBool,
    rings: Mutex<u64>,
    rung: Condvar,
}

impl Bell {
    const fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
            rings: Mutex::new(0),
            rung: Condvar::new(),
        }
    }
}

static LEVEL_BELL: Bell = Bell::new();
static DUMP_BELL: Bell = Bell::new();

const fn bell(channel: Channel) -> &'static Bell {
    match channel {
        Channel::Level => &LEVEL_BELL,
        Channel::Dump => &DUMP_BELL,
    }
}

pub(crate) fn ring(channel: Channel) {
    let bell = bell(channel);
    if !bell.open.load(Ordering::Acquire) {
        return;
    }
    *bell.rings.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    bell.rung.notify_all();
}

/// Condition-variable doorbell (stub implementation).
#[derive(Debug)]
pub struct Doorbell {
    channel: Channel,
}

impl Doorbell {
    /// Opens the doorbell for `channel`.
    pub fn open(channel: Channel) -> io::Result<Self> {
        bell(channel)
            .open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} doorbell is already open", channel.label()),
                )
            })?;
        Ok(Self { channel })
    }

    /// Channel this doorbell serves.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Wakes the waiting thread.
    pub fn ring(&self) {
        ring(self.channel);
    }

    /// Blocks until the doorbell has been rung at least once.
    pub fn wait(&self) -> io::Result<()> {
        let bell = bell(self.channel);
        let mut rings = bell.rings.lock().unwrap_or_else(PoisonError::into_inner);
        while *rings == 0 {
            rings = bell.rung.wait(rings).unwrap_or_else(PoisonError::into_inner);
        }
        *rings = 0;
        Ok(())
    }
}

impl Drop for Doorbell {
    fn drop(&mut self) {
        let bell = bell(self.channel);
        *bell.rings.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        bell.open.store(false, Ordering::Release);
    }
}

/// Signal bindings (stub implementation). Nothing is installed.
#[derive(Debug)]
pub struct SignalBindings {
    level_signal: i32,
    dump_signal: i32,
}

impl SignalBindings {
    /// Records the requested signals without installing handlers.
    pub fn install(level_signal: i32, dump_signal: i32) -> io::Result<Self> {
        if level_signal == dump_signal {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("level and dump signals must differ (both are {level_signal})"),
            ));
        }
        tracing::debug!(level_signal, dump_signal, "signals unsupported; bindings are inert");
        Ok(Self {
            level_signal,
            dump_signal,
        })
    }

    /// Signal carrying level changes.
    #[must_use]
    pub const fn level_signal(&self) -> i32 {
        self.level_signal
    }

    /// Signal requesting dumps.
    #[must_use]
    pub const fn dump_signal(&self) -> i32 {
        self.dump_signal
    }
}

/// Default level signal number (the Unix `SIGUSR1` value).
#[must_use]
pub fn default_level_signal() -> i32 {
    10
}

/// Default dump signal for a given level signal.
#[must_use]
pub fn default_dump_signal(level_signal: i32) -> i32 {
    if level_signal == 10 { 12 } else { level_signal + 1 }
}

/// Sending signals is unsupported on this platform.
pub fn raise_dump(_pid: i32, _signal: i32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "signals are not supported on this platform",
    ))
}

/// Process id of the calling process.
#[must_use]
pub fn current_pid() -> i32 {
    std::process::id() as i32
}
