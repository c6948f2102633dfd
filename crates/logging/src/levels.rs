//! crates/logging/src/levels.rs
//! The ordered verbosity scale shared by the writer and the level coordinator.

use std::fmt;
use std::str::FromStr;

/// Verbosity threshold and message classification.
///
/// The scale is totally ordered: `Disabled < Min < Standard < Max`. `Min` is
/// the least verbose level and `Max` the most verbose. A message tagged with
/// level `L` is persisted while the threshold is `C` iff neither is
/// [`Disabled`](Self::Disabled) and `L <= C`; see [`admits`](Self::admits).
///
/// The numeric values `0..=3` are the payloads accepted from the level-change
/// signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum LogLevel {
    /// Suppresses every message when used as the threshold.
    Disabled = 0,
    /// Least verbose: only messages tagged `Min` are written.
    Min = 1,
    /// Messages tagged `Min` and `Standard` are written.
    #[default]
    Standard = 2,
    /// Most verbose: every non-disabled message is written.
    Max = 3,
}

impl LogLevel {
    /// Every level in ascending order.
    pub const ALL: [Self; 4] = [Self::Disabled, Self::Min, Self::Standard, Self::Max];

    /// Returns the upper-case name written into log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Min => "MIN",
            Self::Standard => "STANDARD",
            Self::Max => "MAX",
        }
    }

    /// Returns the numeric signal payload for this level.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a signal payload back to a level.
    ///
    /// Returns `None` for anything outside `0..=3`.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Min),
            2 => Some(Self::Standard),
            3 => Some(Self::Max),
            _ => None,
        }
    }

    /// Reports whether this is the [`Disabled`](Self::Disabled) level.
    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Reports whether a message tagged `message` passes this threshold.
    ///
    /// ```
    /// use logging::LogLevel;
    ///
    /// let threshold = LogLevel::Standard;
    /// assert!(threshold.admits(LogLevel::Min));
    /// assert!(threshold.admits(LogLevel::Standard));
    /// assert!(!threshold.admits(LogLevel::Max));
    /// assert!(!LogLevel::Disabled.admits(LogLevel::Min));
    /// ```
    #[must_use]
    pub fn admits(self, message: Self) -> bool {
        !self.is_disabled() && !message.is_disabled() && message <= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` keeps width and alignment flags working for the line layout.
        f.pad(self.name())
    }
}

/// Error returned when a payload or string does not name a [`LogLevel`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LevelParseError {
    /// The numeric payload is outside `0..=3`.
    #[error("log level {0} is out of range (expected 0-3)")]
    OutOfRange(i32),
    /// The string is neither a level name nor a number.
    #[error("unknown log level {0:?} (expected disabled, min, standard, max or 0-3)")]
    Unknown(String),
}

impl TryFrom<i32> for LogLevel {
    type Error = LevelParseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_i32(value).ok_or(LevelParseError::OutOfRange(value))
    }
}

impl From<LogLevel> for i32 {
    fn from(level: LogLevel) -> Self {
        level.as_i32()
    }
}

impl FromStr for LogLevel {
    type Err = LevelParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if let Ok(value) = trimmed.parse::<i32>() {
            return Self::try_from(value);
        }

        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LevelParseError::Unknown(text.to_owned()))
    }
}
