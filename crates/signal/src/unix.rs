//! Unix doorbells and signal bindings.
//!
//! # Safety
//!
//! This module calls into libc to install `SA_SIGINFO` handlers, adjust the
//! thread signal mask and send signals. The handlers only touch atomics and
//! call `write(2)` on a non-blocking pipe, both of which are async-signal-safe.
#![allow(unsafe_code)]

use std::fmt;
use std::io::{self, PipeReader, PipeWriter, Read, Write};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread::{self, ThreadId};

use crate::mailbox::{self, Channel};

/// Write end of the level doorbell, or -1 when none is open.
static LEVEL_BELL_FD: AtomicI32 = AtomicI32::new(-1);

/// Write end of the dump doorbell, or -1 when none is open.
static DUMP_BELL_FD: AtomicI32 = AtomicI32::new(-1);

const fn bell_slot(channel: Channel) -> &'static AtomicI32 {
    match channel {
        Channel::Level => &LEVEL_BELL_FD,
        Channel::Dump => &DUMP_BELL_FD,
    }
}

pub(crate) fn ring(channel: Channel) {
    let fd = bell_slot(channel).load(Ordering::Acquire);
    if fd < 0 {
        return;
    }
    let byte = 1_u8;
    // SAFETY: `fd` is the non-blocking write end published by `Doorbell::open`.
    // A full pipe fails with EAGAIN, which is fine: the reader is already due
    // to wake and the mailbox holds the actual request.
    unsafe {
        libc::write(fd, (&raw const byte).cast(), 1);
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: `fd` is an open descriptor owned by the caller.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Self-pipe used to wake a coordinator thread.
///
/// Opening a doorbell publishes its write end so signal handlers and
/// [`Channel::ring`] can reach it; dropping it withdraws the write end before
/// the pipe closes. At most one doorbell per [`Channel`] is open at a time.
pub struct Doorbell {
    channel: Channel,
    reader: PipeReader,
    writer: PipeWriter,
}

impl Doorbell {
    /// Opens the doorbell for `channel`.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] when the channel already
    /// has an open doorbell.
    pub fn open(channel: Channel) -> io::Result<Self> {
        let (reader, writer) = io::pipe()?;
        set_nonblocking(writer.as_raw_fd())?;
        bell_slot(channel)
            .compare_exchange(-1, writer.as_raw_fd(), Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} doorbell is already open", channel.label()),
                )
            })?;
        Ok(Self {
            channel,
            reader,
            writer,
        })
    }

    /// Channel this doorbell serves.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Wakes the waiting thread.
    pub fn ring(&self) {
        match (&self.writer).write(&[1]) {
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {}
            Err(error) => {
                tracing::debug!(channel = self.channel.label(), %error, "doorbell ring failed");
            }
        }
    }

    /// Blocks until the doorbell has been rung at least once.
    ///
    /// Several rings may be consumed by one wake-up; callers drain the
    /// mailbox rather than counting wake-ups.
    pub fn wait(&self) -> io::Result<()> {
        let mut buf = [0_u8; 64];
        loop {
            match (&self.reader).read(&mut buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "doorbell write end closed",
                    ));
                }
                Ok(_) => return Ok(()),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }
}

impl Drop for Doorbell {
    fn drop(&mut self) {
        let _ = bell_slot(self.channel).compare_exchange(
            self.writer.as_raw_fd(),
            -1,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl fmt::Debug for Doorbell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Doorbell")
            .field("channel", &self.channel)
            .field("reader", &self.reader.as_raw_fd())
            .field("writer", &self.writer.as_raw_fd())
            .finish()
    }
}

/// Reads the integer payload carried by a queued signal.
///
/// # Safety
///
/// `info` must be the pointer the kernel passed to an `SA_SIGINFO` handler.
#[cfg(target_os = "linux")]
unsafe fn payload_of(info: *const libc::siginfo_t) -> Option<i32> {
    if info.is_null() {
        return None;
    }
    // SAFETY: guaranteed by the caller.
    let value = unsafe { (*info).si_value() };
    let raw = value.sival_ptr as usize as u64;
    #[cfg(all(target_endian = "big", target_pointer_width = "64"))]
    let raw = raw >> 32;
    Some(raw as u32 as i32)
}

/// Platforms without `sigqueue` deliver no payload.
#[cfg(not(target_os = "linux"))]
unsafe fn payload_of(_info: *const libc::siginfo_t) -> Option<i32> {
    None
}

#[cfg(target_os = "linux")]
fn errno_location() -> Option<*mut libc::c_int> {
    // SAFETY: always returns the calling thread's errno slot.
    Some(unsafe { libc::__errno_location() })
}

#[cfg(any(target_vendor = "apple", target_os = "freebsd"))]
fn errno_location() -> Option<*mut libc::c_int> {
    // SAFETY: always returns the calling thread's errno slot.
    Some(unsafe { libc::__error() })
}

#[cfg(not(any(target_os = "linux", target_vendor = "apple", target_os = "freebsd")))]
fn errno_location() -> Option<*mut libc::c_int> {
    None
}

/// Saves the interrupted thread's `errno` and puts it back on drop.
///
/// A failed doorbell write inside a handler must not leak EAGAIN into the
/// code the signal interrupted.
struct ErrnoGuard {
    slot: Option<*mut libc::c_int>,
    saved: libc::c_int,
}

impl ErrnoGuard {
    fn save() -> Self {
        let slot = errno_location();
        // SAFETY: the slot belongs to the current thread and is always valid.
        let saved = slot.map_or(0, |slot| unsafe { *slot });
        Self { slot, saved }
    }
}

impl Drop for ErrnoGuard {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            // SAFETY: as in `save`; the handler never migrates threads.
            unsafe { *slot = self.saved };
        }
    }
}

extern "C" fn handle_level(_signum: libc::c_int, info: *mut libc::siginfo_t, _ctx: *mut libc::c_void) {
    let _errno = ErrnoGuard::save();
    // SAFETY: invoked by the kernel as an SA_SIGINFO handler.
    if let Some(payload) = unsafe { payload_of(info) } {
        mailbox::post_level(payload);
    }
}

extern "C" fn handle_dump(_signum: libc::c_int, _info: *mut libc::siginfo_t, _ctx: *mut libc::c_void) {
    let _errno = ErrnoGuard::save();
    mailbox::post_dump();
}

type SigInfoHandler = extern "C" fn(libc::c_int, *mut libc::siginfo_t, *mut libc::c_void);

fn install_handler(signal: libc::c_int, handler: SigInfoHandler) -> io::Result<libc::sigaction> {
    // SAFETY: an all-zero `sigaction` is a valid starting value; every field
    // that matters is set below before the struct is handed to the kernel.
    let mut action: libc::sigaction = unsafe { MaybeUninit::zeroed().assume_init() };
    action.sa_sigaction = handler as libc::sighandler_t;
    action.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
    let mut previous = MaybeUninit::<libc::sigaction>::zeroed();
    // SAFETY: all pointers refer to live locals.
    unsafe {
        libc::sigfillset(&raw mut action.sa_mask);
        if libc::sigaction(signal, &raw const action, previous.as_mut_ptr()) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(previous.assume_init())
    }
}

fn restore_handler(signal: libc::c_int, previous: &libc::sigaction) {
    // SAFETY: `previous` was filled in by the kernel for this signal.
    unsafe {
        libc::sigaction(signal, previous, std::ptr::null_mut());
    }
}

fn signal_set(signals: &[libc::c_int]) -> io::Result<libc::sigset_t> {
    let mut set = MaybeUninit::<libc::sigset_t>::zeroed();
    // SAFETY: `set` is initialised by `sigemptyset` before it is read.
    unsafe {
        libc::sigemptyset(set.as_mut_ptr());
        for &signal in signals {
            if libc::sigaddset(set.as_mut_ptr(), signal) != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid signal number {signal}"),
                ));
            }
        }
        Ok(set.assume_init())
    }
}

fn change_mask(how: libc::c_int, set: &libc::sigset_t) -> io::Result<libc::sigset_t> {
    let mut previous = MaybeUninit::<libc::sigset_t>::zeroed();
    // SAFETY: both pointers refer to live values.
    let rc = unsafe { libc::pthread_sigmask(how, set, previous.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    // SAFETY: filled in by `pthread_sigmask` on success.
    Ok(unsafe { previous.assume_init() })
}

fn is_member(set: &libc::sigset_t, signal: libc::c_int) -> bool {
    // SAFETY: `set` is a valid, initialised signal set.
    unsafe { libc::sigismember(set, signal) == 1 }
}

/// Installed level and dump handlers.
///
/// Installing unblocks both signals in the calling thread and remembers the
/// previous dispositions. Dropping the bindings puts the old handlers back
/// and re-blocks whichever of the two signals was blocked before.
///
/// Signal masks are per thread. The mask is only restored when the bindings
/// are dropped on the thread that installed them; dropping them elsewhere
/// restores the handlers and leaves every thread's mask alone.
pub struct SignalBindings {
    level_signal: libc::c_int,
    dump_signal: libc::c_int,
    previous_level: libc::sigaction,
    previous_dump: libc::sigaction,
    previous_mask: libc::sigset_t,
    installer: ThreadId,
}

impl SignalBindings {
    /// Installs the level handler on `level_signal` and the dump handler on
    /// `dump_signal`.
    ///
    /// On failure nothing stays installed and the mask is unchanged.
    pub fn install(level_signal: i32, dump_signal: i32) -> io::Result<Self> {
        if level_signal == dump_signal {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("level and dump signals must differ (both are {level_signal})"),
            ));
        }

        let unblock = signal_set(&[level_signal, dump_signal])?;
        let previous_mask = change_mask(libc::SIG_UNBLOCK, &unblock)?;

        let previous_level = match install_handler(level_signal, handle_level) {
            Ok(previous) => previous,
            Err(error) => {
                restore_mask(&previous_mask, level_signal, dump_signal);
                return Err(error);
            }
        };
        let previous_dump = match install_handler(dump_signal, handle_dump) {
            Ok(previous) => previous,
            Err(error) => {
                restore_handler(level_signal, &previous_level);
                restore_mask(&previous_mask, level_signal, dump_signal);
                return Err(error);
            }
        };

        tracing::debug!(level_signal, dump_signal, "signal handlers installed");
        Ok(Self {
            level_signal,
            dump_signal,
            previous_level,
            previous_dump,
            previous_mask,
            installer: thread::current().id(),
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

fn restore_mask(previous: &libc::sigset_t, level_signal: libc::c_int, dump_signal: libc::c_int) {
    let blocked: Vec<libc::c_int> = [level_signal, dump_signal]
        .into_iter()
        .filter(|&signal| is_member(previous, signal))
        .collect();
    if blocked.is_empty() {
        return;
    }
    if let Err(error) = signal_set(&blocked).and_then(|set| change_mask(libc::SIG_BLOCK, &set)) {
        tracing::warn!(%error, "failed to re-block signals");
    }
}

impl Drop for SignalBindings {
    fn drop(&mut self) {
        restore_handler(self.dump_signal, &self.previous_dump);
        restore_handler(self.level_signal, &self.previous_level);
        if thread::current().id() == self.installer {
            restore_mask(&self.previous_mask, self.level_signal, self.dump_signal);
        } else {
            tracing::debug!("bindings dropped off the installing thread; mask left unchanged");
        }
        tracing::debug!(
            level_signal = self.level_signal,
            dump_signal = self.dump_signal,
            "signal handlers restored"
        );
    }
}

impl fmt::Debug for SignalBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBindings")
            .field("level_signal", &self.level_signal)
            .field("dump_signal", &self.dump_signal)
            .finish_non_exhaustive()
    }
}

/// Default level signal: `SIGRTMIN` where real-time signals exist, `SIGUSR1`
/// otherwise.
#[must_use]
pub fn default_level_signal() -> i32 {
    #[cfg(target_os = "linux")]
    {
        libc::SIGRTMIN()
    }
    #[cfg(not(target_os = "linux"))]
    {
        libc::SIGUSR1
    }
}

/// Default dump signal for a given level signal: the next signal number, or
/// `SIGUSR2` when the level signal is `SIGUSR1`.
#[must_use]
pub fn default_dump_signal(level_signal: i32) -> i32 {
    if level_signal == libc::SIGUSR1 {
        libc::SIGUSR2
    } else {
        level_signal + 1
    }
}

/// Sends `signal` with an integer `payload` to process `pid`.
#[cfg(target_os = "linux")]
pub fn queue(pid: i32, signal: i32, payload: i32) -> io::Result<()> {
    let raw = payload as u32 as usize;
    #[cfg(all(target_endian = "big", target_pointer_width = "64"))]
    let raw = raw << 32;
    let value = libc::sigval {
        sival_ptr: std::ptr::without_provenance_mut(raw),
    };
    // SAFETY: `sigqueue` only reads its arguments.
    if unsafe { libc::sigqueue(pid, signal, value) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Sends the plain `signal` to process `pid`.
pub fn raise_dump(pid: i32, signal: i32) -> io::Result<()> {
    // SAFETY: `kill` only reads its arguments.
    if unsafe { libc::kill(pid, signal) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Process id of the calling process.
#[must_use]
pub fn current_pid() -> i32 {
    std::process::id() as i32
}
