//! Process-wide service instance.
//!
//! Libraries that cannot thread a [`Siglog`] handle through their call graph
//! log through these functions instead. Every call made before [`init`] or
//! after [`teardown`] does nothing and succeeds.
//!
//! Dump producers must not call back into this module: they run while the
//! registry is locked, and [`teardown`] may be waiting for exclusive access.
//!
//! # Examples
//!
//! ```no_run
//! use siglog::{SiglogConfig, global};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! global::init(SiglogConfig::from_env()?)?;
//! siglog::standard!("listening on port {}", 8080);
//! global::teardown();
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dump::{CapacityError, Watchpoint};
use logging::LogLevel;

use crate::config::SiglogConfig;
use crate::error::InitError;
use crate::lifecycle::Siglog;

fn slot() -> &'static RwLock<Option<Siglog>> {
    static INSTANCE: OnceLock<RwLock<Option<Siglog>>> = OnceLock::new();
    INSTANCE.get_or_init(|| RwLock::new(None))
}

fn read() -> RwLockReadGuard<'static, Option<Siglog>> {
    slot().read().unwrap_or_else(PoisonError::into_inner)
}

fn write() -> RwLockWriteGuard<'static, Option<Siglog>> {
    slot().write().unwrap_or_else(PoisonError::into_inner)
}

/// Starts the process-wide service.
pub fn init(config: SiglogConfig) -> Result<(), InitError> {
    let mut instance = write();
    if instance.is_some() {
        return Err(InitError::AlreadyInitialized);
    }
    *instance = Some(Siglog::initialize(config)?);
    Ok(())
}

/// Stops the process-wide service, if running.
pub fn teardown() {
    let instance = write().take();
    if let Some(mut service) = instance {
        service.teardown();
    }
}

/// Reports whether the process-wide service is running.
#[must_use]
pub fn is_initialized() -> bool {
    read().is_some()
}

/// Current threshold of the process-wide service.
#[must_use]
pub fn level() -> Option<LogLevel> {
    read().as_ref().map(Siglog::level)
}

/// Logs through the process-wide service.
pub fn log(level: LogLevel, message: fmt::Arguments<'_>) -> io::Result<()> {
    match read().as_ref() {
        Some(service) => service.log(level, message),
        None => Ok(()),
    }
}

/// Registers a dump producer with the process-wide service.
pub fn register_producer<F>(producer: F) -> Result<(), CapacityError>
where
    F: Fn(&mut dyn Write) -> io::Result<()> + Send + Sync + 'static,
{
    match read().as_ref() {
        Some(service) => service.register_producer(producer),
        None => Ok(()),
    }
}

/// Registers a watchpoint with the process-wide service.
pub fn register_watch(watch: Watchpoint) -> Result<(), CapacityError> {
    match read().as_ref() {
        Some(service) => service.register_watch(watch),
        None => Ok(()),
    }
}
