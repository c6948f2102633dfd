#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `dump` holds the capture side of the logging service: the registry of
//! entries rendered into a snapshot file, the watchpoint type describing
//! caller memory, and the routine that writes one dump file.
//!
//! # Design
//!
//! Every registry slot is a [`DumpEntry`]. Producers are boxed callbacks that
//! write whatever they like into the sink; watchpoints are typed, non-owning
//! views of caller memory that render as `"<name>: <value>\n"`. The
//! [`DumpRegistry`] keeps the entries in insertion order behind a mutex of its
//! own and grows by explicit, fallible doubling.
//!
//! # Invariants
//!
//! - Entries render in registration order.
//! - A dump holds the registry lock while it iterates, so registrations from
//!   other threads land entirely before or entirely after it.
//! - Producers must not register entries; the registry lock is held while they
//!   run.
//!
//! # Errors
//!
//! Registration fails with [`CapacityError`] when the registry cannot grow.
//! Writing a dump surfaces [`std::io::Error`] values from file creation,
//! producers and the final flush.
//!
//! # Examples
//!
//! ```
//! use std::io::Write;
//! use std::sync::atomic::AtomicU32;
//! use dump::{DumpEntry, DumpRegistry, Watchpoint, write_dump};
//!
//! static QUEUED: AtomicU32 = AtomicU32::new(3);
//!
//! let dir = tempfile::tempdir()?;
//! let registry = DumpRegistry::new()?;
//! registry.register(DumpEntry::producer(|sink| writeln!(sink, "status: ok")))?;
//! registry.register(Watchpoint::new("queued", &QUEUED))?;
//!
//! let report = write_dump(Some(dir.path()), "DUMP-demo", &registry)?;
//! let text = std::fs::read_to_string(report.path)?;
//! assert_eq!(text, "DUMP-demo\n---------------------\nstatus: ok\nqueued: 3\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod entry;
mod file;
mod registry;
mod watch;

pub use entry::{DumpEntry, Producer};
pub use file::{DUMP_PREFIX, DumpNamer, DumpReport, HEADER_RULE, dump_path, write_dump};
pub use registry::{CapacityError, DumpRegistry, INITIAL_CAPACITY};
pub use watch::{ValueType, Watchable, Watchpoint};
