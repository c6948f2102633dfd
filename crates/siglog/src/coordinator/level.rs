//! Level coordinator: validates pending payloads and applies them.

use std::sync::Arc;

use logging::{LogLevel, LogWriter};
use signal::{Channel, Doorbell};

use super::Worker;
use crate::lifecycle::Shared;

/// Name of the level coordinator thread.
pub(crate) const THREAD_NAME: &str = "siglog-level";

pub(crate) fn spawn(shared: Arc<Shared>, bell: Doorbell) -> std::io::Result<Worker> {
    debug_assert_eq!(bell.channel(), Channel::Level);
    Worker::spawn(THREAD_NAME, bell, move |_| {
        apply_pending(&shared.writer);
    })
}

/// Takes the pending payload, if any, and applies it when it names a level.
///
/// Returns the level that was applied.
pub(crate) fn apply_pending(writer: &LogWriter) -> Option<LogLevel> {
    let payload = signal::take_level()?;
    let Some(level) = LogLevel::from_i32(payload) else {
        tracing::debug!(payload, "ignoring invalid level payload");
        return None;
    };
    let previous = writer.set_level(level);
    tracing::info!(level = level.as_i32(), name = level.name(), %previous, "logging level changed");
    Some(level)
}
