//! crates/siglog/src/lifecycle.rs
//! Initialisation and teardown of the logging service.
//!
//! Resources are acquired in a fixed order (log file, registry, doorbells,
//! coordinators, signal bindings) and released in the reverse order. Each
//! acquired resource is an RAII guard, so an early return during
//! initialisation drops, and thereby releases, everything acquired so far.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool, AtomicI8, AtomicI16, AtomicI32, AtomicI64, AtomicU8, AtomicU16, AtomicU32,
    AtomicU64, Ordering,
};

use dump::{CapacityError, DumpEntry, DumpRegistry, Watchpoint};
use logging::{LogLevel, LogWriter, log_path};
use signal::{Channel, Doorbell, SignalBindings};

use crate::config::SiglogConfig;
use crate::coordinator::{self, Worker};
use crate::error::InitError;

/// Set while a [`Siglog`] instance is live in this process.
static ACTIVE: AtomicBool = AtomicBool::new(false);

struct ActiveGuard;

impl ActiveGuard {
    fn acquire() -> Result<Self, InitError> {
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self)
            .map_err(|_| InitError::AlreadyInitialized)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::Release);
    }
}

/// State shared between caller threads and the coordinators.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) writer: LogWriter,
    pub(crate) registry: DumpRegistry,
    pub(crate) directory: Option<PathBuf>,
}

/// Resources that only exist between initialisation and teardown.
///
/// Fields drop in declaration order, which is the teardown order.
struct Runtime {
    bindings: SignalBindings,
    level_worker: Worker,
    dump_worker: Worker,
    _active: ActiveGuard,
}

impl Runtime {
    fn shutdown(self) {
        let Self {
            bindings,
            mut level_worker,
            mut dump_worker,
            _active,
        } = self;
        drop(bindings);
        level_worker.stop();
        dump_worker.stop();
    }
}

/// A running logging service.
///
/// While live, the level signal changes the threshold and the dump signal
/// writes a dump file. Only one instance may be live per process; a second
/// [`initialize`](Self::initialize) fails with
/// [`InitError::AlreadyInitialized`] until the first is torn down.
///
/// After [`teardown`](Self::teardown) (or on drop) the handle stays usable:
/// logging and registration quietly do nothing.
///
/// # Examples
///
/// ```no_run
/// use std::io::Write;
/// use siglog::{LogLevel, Siglog, SiglogConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SiglogConfig::builder()
///     .start_level(LogLevel::Standard)
///     .directory("/var/tmp")
///     .build();
/// let mut service = Siglog::initialize(config)?;
///
/// service.standard(format_args!("started with {} workers", 4))?;
/// service.register_producer(|sink| writeln!(sink, "status: ok"))?;
///
/// service.teardown();
/// # Ok(())
/// # }
/// ```
pub struct Siglog {
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
}

impl Siglog {
    /// Starts the service described by `config`.
    ///
    /// On error every resource acquired so far has already been released.
    pub fn initialize(config: SiglogConfig) -> Result<Self, InitError> {
        let active = ActiveGuard::acquire()?;
        signal::reset();

        let directory = config.directory().map(Path::to_path_buf);
        let writer = LogWriter::open(directory.as_deref(), config.start_level()).map_err(
            |source| InitError::OpenLog {
                path: log_path(directory.as_deref()),
                source,
            },
        )?;
        let registry = DumpRegistry::new()?;
        let shared = Arc::new(Shared {
            writer,
            registry,
            directory,
        });

        let level_bell = open_doorbell(Channel::Level)?;
        let dump_bell = open_doorbell(Channel::Dump)?;

        let level_worker = coordinator::level::spawn(Arc::clone(&shared), level_bell).map_err(
            |source| InitError::Spawn {
                thread: coordinator::level::THREAD_NAME,
                source,
            },
        )?;
        let dump_worker = coordinator::dump::spawn(Arc::clone(&shared), dump_bell).map_err(
            |source| InitError::Spawn {
                thread: coordinator::dump::THREAD_NAME,
                source,
            },
        )?;

        let (level_signal, dump_signal) = config.resolved_signals();
        let bindings = SignalBindings::install(level_signal, dump_signal).map_err(|source| {
            InitError::Bind {
                level_signal,
                dump_signal,
                source,
            }
        })?;

        tracing::info!(
            level = %config.start_level(),
            level_signal,
            dump_signal,
            directory = %shared.directory.as_deref().unwrap_or_else(|| Path::new(".")).display(),
            "logging service started"
        );

        Ok(Self {
            shared,
            runtime: Some(Runtime {
                bindings,
                level_worker,
                dump_worker,
                _active: active,
            }),
        })
    }

    /// Stops the service: restores the signal handlers, stops and joins both
    /// coordinators, releases the registry and closes the log file.
    ///
    /// Calling it again does nothing.
    pub fn teardown(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        runtime.shutdown();
        self.shared.registry.release();
        if let Err(error) = self.shared.writer.close() {
            tracing::warn!(%error, "failed to close log file");
        }
        tracing::info!("logging service stopped");
    }

    /// Reports whether the service has not been torn down yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.runtime.is_some()
    }

    /// Current threshold.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.shared.writer.level()
    }

    /// Directory holding the log and dump files; `None` is the working
    /// directory.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.shared.directory.as_deref()
    }

    /// Signal numbers `(level, dump)` bound while the service is active.
    #[must_use]
    pub fn signals(&self) -> Option<(i32, i32)> {
        self.runtime.as_ref().map(|runtime| {
            (
                runtime.bindings.level_signal(),
                runtime.bindings.dump_signal(),
            )
        })
    }

    /// Appends one line when `level` passes the current threshold.
    pub fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.shared.writer.write(level, message).map(drop)
    }

    /// Logs at [`LogLevel::Min`].
    pub fn min(&self, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.log(LogLevel::Min, message)
    }

    /// Logs at [`LogLevel::Standard`].
    pub fn standard(&self, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.log(LogLevel::Standard, message)
    }

    /// Logs at [`LogLevel::Max`].
    pub fn max(&self, message: fmt::Arguments<'_>) -> io::Result<()> {
        self.log(LogLevel::Max, message)
    }

    /// Appends an entry to the dump registry.
    pub fn register(&self, entry: impl Into<DumpEntry>) -> Result<(), CapacityError> {
        if !self.is_active() {
            return Ok(());
        }
        self.shared.registry.register(entry)
    }

    /// Registers a callback that writes into every dump.
    ///
    /// The callback runs on the dump coordinator while the registry is
    /// locked; it must not register entries itself.
    pub fn register_producer<F>(&self, producer: F) -> Result<(), CapacityError>
    where
        F: Fn(&mut dyn Write) -> io::Result<()> + Send + Sync + 'static,
    {
        self.register(DumpEntry::producer(producer))
    }

    /// Registers a watchpoint rendered as `"<name>: <value>"` in every dump.
    pub fn register_watch(&self, watch: Watchpoint) -> Result<(), CapacityError> {
        self.register(watch)
    }

    /// Watches an `i8`.
    pub fn watch_i8(&self, name: &str, value: &'static AtomicI8) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches an `i16`.
    pub fn watch_i16(&self, name: &str, value: &'static AtomicI16) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches an `i32`.
    pub fn watch_i32(&self, name: &str, value: &'static AtomicI32) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches an `i64`.
    pub fn watch_i64(&self, name: &str, value: &'static AtomicI64) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches a `u8`.
    pub fn watch_u8(&self, name: &str, value: &'static AtomicU8) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches a `u16`.
    pub fn watch_u16(&self, name: &str, value: &'static AtomicU16) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches a `u32`.
    pub fn watch_u32(&self, name: &str, value: &'static AtomicU32) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches a `u64`.
    pub fn watch_u64(&self, name: &str, value: &'static AtomicU64) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::new(name, value))
    }

    /// Watches an `f32` kept as raw bits.
    pub fn watch_f32(&self, name: &str, bits: &'static AtomicU32) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::f32_bits(name, bits))
    }

    /// Watches an `f64` kept as raw bits.
    pub fn watch_f64(&self, name: &str, bits: &'static AtomicU64) -> Result<(), CapacityError> {
        self.register_watch(Watchpoint::f64_bits(name, bits))
    }
}

fn open_doorbell(channel: Channel) -> Result<Doorbell, InitError> {
    Doorbell::open(channel).map_err(|source| InitError::Doorbell {
        channel: channel.label(),
        source,
    })
}

impl Drop for Siglog {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Siglog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Siglog")
            .field("active", &self.is_active())
            .field("level", &self.level())
            .field("directory", &self.directory())
            .field("signals", &self.signals())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_in(dir: &Path) -> SiglogConfig {
        SiglogConfig::builder()
            .start_level(LogLevel::Standard)
            .directory(dir)
            .build()
    }

    #[test]
    fn second_instance_is_rejected_until_teardown() {
        let _guard = test_support::serial();
        let temp = test_support::scratch_dir();
        let mut first = Siglog::initialize(config_in(temp.path())).expect("first");

        let err = Siglog::initialize(config_in(temp.path())).expect_err("second");
        assert!(matches!(err, InitError::AlreadyInitialized));

        first.teardown();
        Siglog::initialize(config_in(temp.path())).expect("after teardown");
    }

    #[test]
    fn teardown_is_idempotent() {
        let _guard = test_support::serial();
        let temp = test_support::scratch_dir();
        let mut service = Siglog::initialize(config_in(temp.path())).expect("init");
        service.teardown();
        service.teardown();
        assert!(!service.is_active());
        assert_eq!(service.signals(), None);
    }

    #[test]
    fn torn_down_handle_is_inert() {
        let _guard = test_support::serial();
        let temp = test_support::scratch_dir();
        let mut service = Siglog::initialize(config_in(temp.path())).expect("init");
        service.min(format_args!("before")).expect("log");
        service.teardown();

        service.min(format_args!("after")).expect("log after teardown");
        service
            .register_producer(|sink| sink.write_all(b"late\n"))
            .expect("register after teardown");

        let contents = fs::read_to_string(log_path(Some(temp.path()))).expect("read");
        assert!(contents.contains("before"));
        assert!(!contents.contains("after"));
    }

    #[test]
    fn missing_directory_fails_and_releases_the_slot() {
        let _guard = test_support::serial();
        let temp = test_support::scratch_dir();
        let missing = temp.path().join("absent");

        let err = Siglog::initialize(config_in(&missing)).expect_err("missing dir");
        assert!(matches!(err, InitError::OpenLog { .. }));

        Siglog::initialize(config_in(temp.path())).expect("slot released");
    }

    #[cfg(unix)]
    #[test]
    fn bind_failure_rolls_back_workers_and_doorbells() {
        let _guard = test_support::serial();
        let temp = test_support::scratch_dir();
        let config = SiglogConfig::builder()
            .directory(temp.path())
            .level_signal(9999)
            .dump_signal(10_000)
            .build();

        let err = Siglog::initialize(config).expect_err("invalid signals");
        assert!(matches!(err, InitError::Bind { .. }));

        let service = Siglog::initialize(config_in(temp.path())).expect("clean rollback");
        assert!(service.is_active());
    }

    #[test]
    fn start_level_is_applied() {
        let _guard = test_support::serial();
        let temp = test_support::scratch_dir();
        let config = SiglogConfig::builder()
            .start_level(LogLevel::Max)
            .directory(temp.path())
            .build();
        let service = Siglog::initialize(config).expect("init");
        assert_eq!(service.level(), LogLevel::Max);
        assert_eq!(service.directory(), Some(temp.path()));
    }
}
