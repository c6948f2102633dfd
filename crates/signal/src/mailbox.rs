//! Pending-notification mailbox shared by the signal handlers and the
//! coordinator threads.
//!
//! Everything here is lock-free and allocation-free so it can run inside a
//! signal handler. The level slot keeps only the most recent payload; the dump
//! counter keeps every request.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::sys;

/// Marks the level slot as holding an unconsumed payload.
const LEVEL_PENDING: u64 = 1 << 32;

/// Latest level payload, tagged with [`LEVEL_PENDING`]. Zero means empty.
static LEVEL_SLOT: AtomicU64 = AtomicU64::new(0);

/// Dump requests not yet taken by the dump coordinator.
static PENDING_DUMPS: AtomicUsize = AtomicUsize::new(0);

/// The two notification channels, each with its own doorbell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// "Change the logging level" notifications.
    Level,
    /// "Write a dump now" notifications.
    Dump,
}

impl Channel {
    /// Wakes whichever thread waits on this channel's doorbell.
    ///
    /// Does nothing when no doorbell is open. Async-signal-safe.
    #[inline]
    pub fn ring(self) {
        sys::ring(self);
    }

    /// Short label used in diagnostics and thread names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::Dump => "dump",
        }
    }
}

/// Stores `payload` as the pending level change and rings the level doorbell.
///
/// An unconsumed earlier payload is overwritten. Async-signal-safe.
#[inline]
pub fn post_level(payload: i32) {
    LEVEL_SLOT.store(LEVEL_PENDING | u64::from(payload as u32), Ordering::Release);
    Channel::Level.ring();
}

/// Counts one more dump request and rings the dump doorbell.
///
/// Async-signal-safe.
#[inline]
pub fn post_dump() {
    PENDING_DUMPS.fetch_add(1, Ordering::AcqRel);
    Channel::Dump.ring();
}

/// Takes the pending level payload, leaving the slot empty.
#[must_use]
pub fn take_level() -> Option<i32> {
    let slot = LEVEL_SLOT.swap(0, Ordering::AcqRel);
    (slot & LEVEL_PENDING != 0).then_some(slot as u32 as i32)
}

/// Takes every pending dump request and returns how many there were.
#[must_use]
pub fn take_dumps() -> usize {
    PENDING_DUMPS.swap(0, Ordering::AcqRel)
}

/// Discards anything still pending.
///
/// Called when the service starts so stale notifications from an earlier
/// instance are not replayed.
pub fn reset() {
    LEVEL_SLOT.store(0, Ordering::Release);
    PENDING_DUMPS.store(0, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_slot_starts_empty_after_reset() {
        let _guard = test_support::serial();
        reset();
        assert_eq!(take_level(), None);
        assert_eq!(take_dumps(), 0);
    }

    #[test]
    fn last_level_payload_wins() {
        let _guard = test_support::serial();
        reset();
        post_level(1);
        post_level(3);
        post_level(2);
        assert_eq!(take_level(), Some(2));
        assert_eq!(take_level(), None);
    }

    #[test]
    fn negative_and_zero_payloads_survive_the_slot() {
        let _guard = test_support::serial();
        reset();
        post_level(0);
        assert_eq!(take_level(), Some(0));
        post_level(-1);
        assert_eq!(take_level(), Some(-1));
        post_level(i32::MIN);
        assert_eq!(take_level(), Some(i32::MIN));
    }

    #[test]
    fn dump_requests_accumulate() {
        let _guard = test_support::serial();
        reset();
        for _ in 0..5 {
            post_dump();
        }
        assert_eq!(take_dumps(), 5);
        assert_eq!(take_dumps(), 0);
    }

    #[test]
    fn posting_without_a_doorbell_is_harmless() {
        let _guard = test_support::serial();
        reset();
        Channel::Level.ring();
        Channel::Dump.ring();
        post_dump();
        assert_eq!(take_dumps(), 1);
    }
}
