#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `signal` is the notification layer of the logging service. It turns
//! asynchronous POSIX signals into pending work that ordinary threads pick up:
//! a "change level" signal carrying an integer payload, and a "dump now"
//! signal carrying nothing.
//!
//! # Design
//!
//! Signal handlers may run almost nothing, so they only store into a static
//! mailbox ([`post_level`], [`post_dump`]) and ring a [`Doorbell`], a
//! self-pipe whose non-blocking write end is published through an atomic
//! descriptor slot. A coordinator thread blocks on the read end, wakes, and
//! drains the mailbox with [`take_level`] and [`take_dumps`].
//!
//! [`SignalBindings`] owns the installed handlers. It unblocks both signals
//! in the installing thread, remembers the previous dispositions, and puts
//! them back when dropped.
//!
//! # Invariants
//!
//! - Level payloads are last-write-wins: a burst collapses to the latest one.
//! - Dump requests are counted, never coalesced: `k` posts yield `k` from
//!   [`take_dumps`].
//! - A full doorbell pipe never loses a request; the mailbox holds the data
//!   and the pipe only wakes the reader.
//!
//! # Examples
//!
//! ```
//! use signal::{post_dump, post_level, take_dumps, take_level};
//!
//! post_level(1);
//! post_level(3);
//! post_dump();
//! post_dump();
//!
//! assert_eq!(take_level(), Some(3));
//! assert_eq!(take_dumps(), 2);
//! ```
//!
//! # Platform Support
//!
//! - **Linux**: real-time signal defaults (`SIGRTMIN`, `SIGRTMIN + 1`) and
//!   payload delivery through [`queue`].
//! - **Other Unix**: `SIGUSR1` / `SIGUSR2` defaults; the level signal carries
//!   no payload.
//! - **Non-Unix**: in-process triggers only; bindings install nothing.

mod mailbox;

pub use mailbox::{Channel, post_dump, post_level, reset, take_dumps, take_level};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as sys;
#[cfg(unix)]
pub use unix::{
    Doorbell, SignalBindings, current_pid, default_dump_signal, default_level_signal, raise_dump,
};
#[cfg(target_os = "linux")]
pub use unix::queue;

#[cfg(not(unix))]
mod stub;
#[cfg(not(unix))]
use stub as sys;
#[cfg(not(unix))]
pub use stub::{
    Doorbell, SignalBindings, current_pid, default_dump_signal, default_level_signal, raise_dump,
};
