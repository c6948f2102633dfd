//! crates/dump/src/file.rs
//! Naming and writing of dump files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use logging::timestamp;
use time::OffsetDateTime;

use crate::registry::DumpRegistry;

/// Prefix of every dump file name.
pub const DUMP_PREFIX: &str = "DUMP-";

/// Rule written below the file name in the dump header.
pub const HEADER_RULE: &str = "---------------------";

/// Produces unique dump file names from wall-clock seconds.
///
/// The first dump in a given second is named `DUMP-MM.DD.YY-HH:MM:SS`; later
/// dumps in the same second get `-1`, `-2`, ... appended.
///
/// ```
/// use dump::DumpNamer;
/// use time::macros::datetime;
///
/// let mut namer = DumpNamer::new();
/// let at = datetime!(2026-10-18 12:00:00 UTC);
/// assert_eq!(namer.next_name(at), "DUMP-10.18.26-12:00:00");
/// assert_eq!(namer.next_name(at), "DUMP-10.18.26-12:00:00-1");
/// ```
#[derive(Debug, Default)]
pub struct DumpNamer {
    last_stamp: String,
    repeats: u32,
}

impl DumpNamer {
    /// Creates a namer with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_stamp: String::new(),
            repeats: 0,
        }
    }

    /// Returns the name for a dump taken at `at`.
    pub fn next_name(&mut self, at: OffsetDateTime) -> String {
        let stamp = timestamp::dump_stamp(at);
        if stamp == self.last_stamp {
            self.repeats += 1;
            format!("{DUMP_PREFIX}{stamp}-{}", self.repeats)
        } else {
            self.repeats = 0;
            let name = format!("{DUMP_PREFIX}{stamp}");
            self.last_stamp = stamp;
            name
        }
    }
}

/// Returns `<directory>/<file_name>`, or `file_name` relative to the working
/// directory.
#[must_use]
pub fn dump_path(directory: Option<&Path>, file_name: &str) -> PathBuf {
    directory.map_or_else(|| PathBuf::from(file_name), |dir| dir.join(file_name))
}

/// Outcome of one successful dump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpReport {
    /// File the dump was written to.
    pub path: PathBuf,
    /// Number of registry entries rendered.
    pub entries: usize,
}

/// Creates `file_name` under `directory` and writes the header followed by
/// every registry entry.
///
/// The registry lock is held only while the entries render. An existing file
/// with the same name is truncated.
pub fn write_dump(
    directory: Option<&Path>,
    file_name: &str,
    registry: &DumpRegistry,
) -> io::Result<DumpReport> {
    let path = dump_path(directory, file_name);
    let mut out = BufWriter::new(File::create(&path)?);
    write!(out, "{file_name}\n{HEADER_RULE}\n")?;
    let entries = registry.render_all(&mut out)?;
    out.flush()?;
    Ok(DumpReport { path, entries })
}
