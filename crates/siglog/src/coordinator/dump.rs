//! Dump coordinator: writes one dump file per pending request.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dump::{DumpNamer, write_dump};
use logging::timestamp;
use signal::{Channel, Doorbell};

use super::{StopFlag, Worker};
use crate::lifecycle::Shared;

/// Name of the dump coordinator thread.
pub(crate) const THREAD_NAME: &str = "siglog-dump";

pub(crate) fn spawn(shared: Arc<Shared>, bell: Doorbell) -> std::io::Result<Worker> {
    debug_assert_eq!(bell.channel(), Channel::Dump);
    let mut namer = DumpNamer::new();
    Worker::spawn(THREAD_NAME, bell, move |stop| {
        drain(&shared, &mut namer, stop);
    })
}

/// Performs every pending dump, one after another.
///
/// Returns the number of dump files written. Requests still pending when the
/// stop flag is raised are dropped.
pub(crate) fn drain(shared: &Shared, namer: &mut DumpNamer, stop: &StopFlag) -> usize {
    let pending = signal::take_dumps();
    let mut written = 0;
    for _ in 0..pending {
        if stop.is_set() {
            tracing::debug!(skipped = pending - written, "stop requested; dropping pending dumps");
            break;
        }
        if dump_once(shared, namer) {
            written += 1;
        }
    }
    written
}

/// Writes one dump file. A producer that panics ends that dump early; the
/// panic is reported and later requests are still served.
fn dump_once(shared: &Shared, namer: &mut DumpNamer) -> bool {
    let name = namer.next_name(timestamp::now());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        write_dump(shared.directory.as_deref(), &name, &shared.registry)
    }));
    match outcome {
        Ok(Ok(report)) => {
            tracing::info!(path = %report.path.display(), entries = report.entries, "dump written");
            true
        }
        Ok(Err(error)) => {
            tracing::warn!(file = %name, %error, "dump failed");
            false
        }
        Err(payload) => {
            tracing::error!(file = %name, panic = panic_message(&*payload), "dump producer panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
