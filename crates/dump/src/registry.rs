use std::collections::TryReserveError;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::entry::DumpEntry;

/// Capacity reserved when a registry is created.
pub const INITIAL_CAPACITY: usize = 8;

/// Error returned when the registry cannot grow.
///
/// Entries registered before the failure are left untouched.
#[derive(Debug, thiserror::Error)]
#[error("dump registry could not grow to {requested} entries")]
pub struct CapacityError {
    requested: usize,
    #[source]
    source: TryReserveError,
}

impl CapacityError {
    /// Capacity the failed reservation asked for.
    #[must_use]
    pub const fn requested(&self) -> usize {
        self.requested
    }
}

/// Ordered, growable collection of dump entries behind its own lock.
///
/// Insertion order is emission order. There is no removal: entries live until
/// [`release`](Self::release). A dump holds the lock for its whole iteration,
/// so it never observes the sequence mid-mutation.
#[derive(Debug)]
pub struct DumpRegistry {
    entries: Mutex<Vec<DumpEntry>>,
}

impl DumpRegistry {
    /// Allocates an empty registry with [`INITIAL_CAPACITY`] slots.
    pub fn new() -> Result<Self, CapacityError> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(INITIAL_CAPACITY)
            .map_err(|source| CapacityError {
                requested: INITIAL_CAPACITY,
                source,
            })?;
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DumpEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `entry`, doubling the capacity when the registry is full.
    pub fn register(&self, entry: impl Into<DumpEntry>) -> Result<(), CapacityError> {
        let mut entries = self.lock();
        if entries.len() == entries.capacity() {
            let additional = entries.capacity().max(INITIAL_CAPACITY);
            entries
                .try_reserve_exact(additional)
                .map_err(|source| CapacityError {
                    requested: entries.capacity().saturating_add(additional),
                    source,
                })?;
        }
        entries.push(entry.into());
        Ok(())
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Reports whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Currently allocated slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Renders every entry in insertion order while holding the lock.
    ///
    /// Stops at the first failing entry. Returns the number of entries
    /// rendered.
    pub fn render_all(&self, sink: &mut dyn Write) -> std::io::Result<usize> {
        let entries = self.lock();
        for entry in entries.iter() {
            entry.render(sink)?;
        }
        Ok(entries.len())
    }

    /// Drops every entry and frees the storage.
    pub fn release(&self) {
        let released = std::mem::take(&mut *self.lock());
        drop(released);
    }
}
