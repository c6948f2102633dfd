use std::fmt;
use std::io::{self, Write};

use crate::watch::Watchpoint;

/// Caller-supplied callback that writes arbitrary text into the dump.
///
/// Producers run on the dump worker while the registry lock is held, so they
/// must not register further entries.
pub type Producer = Box<dyn Fn(&mut dyn Write) -> io::Result<()> + Send + Sync>;

/// One registry slot.
pub enum DumpEntry {
    /// Opaque callback invoked with the dump sink.
    Producer(Producer),
    /// Typed view of caller memory rendered as `"<name>: <value>\n"`.
    Watch(Watchpoint),
}

impl DumpEntry {
    /// Boxes `render` as a [`DumpEntry::Producer`].
    pub fn producer<F>(render: F) -> Self
    where
        F: Fn(&mut dyn Write) -> io::Result<()> + Send + Sync + 'static,
    {
        Self::Producer(Box::new(render))
    }

    /// Writes this entry into `sink`.
    ///
    /// Producers write whatever they like, including their own newlines.
    /// Watchpoints write exactly one line.
    pub fn render(&self, sink: &mut dyn Write) -> io::Result<()> {
        match self {
            Self::Producer(render) => render(sink),
            Self::Watch(watch) => writeln!(sink, "{}", watch.render_line()),
        }
    }
}

impl From<Watchpoint> for DumpEntry {
    fn from(watch: Watchpoint) -> Self {
        Self::Watch(watch)
    }
}

impl fmt::Debug for DumpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer(_) => f.write_str("Producer(..)"),
            Self::Watch(watch) => f.debug_tuple("Watch").field(watch).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI16;

    #[test]
    fn producer_output_is_written_verbatim() {
        let entry = DumpEntry::producer(|sink| sink.write_all(b"x: 1\n"));
        let mut out = Vec::new();
        entry.render(&mut out).expect("render");
        assert_eq!(out, b"x: 1\n");
    }

    #[test]
    fn watch_renders_one_line() {
        static DEPTH: AtomicI16 = AtomicI16::new(-12);
        let entry = DumpEntry::from(Watchpoint::new("depth", &DEPTH));
        let mut out = Vec::new();
        entry.render(&mut out).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf-8"), "depth: -12\n");
    }

    #[test]
    fn producer_errors_propagate() {
        let entry = DumpEntry::producer(|_| Err(io::Error::other("boom")));
        let err = entry.render(&mut Vec::new()).expect_err("producer fails");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn debug_hides_the_closure() {
        let entry = DumpEntry::producer(|_| Ok(()));
        assert_eq!(format!("{entry:?}"), "Producer(..)");
    }
}
