//! Leveled, module-tagged logging sink.
//!
//! The host's logging sink has six levels (`debug, info, notice, warning,
//! err, crit`), which does not map one-to-one onto `tracing`'s five
//! (`trace, debug, info, warn, error`). Rather than lose a level, events
//! carry the original [`LogLevel`] as a field and use the nearest
//! `tracing` level for filtering, exactly as the format the host expects:
//! "lines include the level name and module in brackets."

use std::fmt;

/// One of the six levels the host logging sink accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Verbose diagnostic detail, off by default in production.
    Debug,
    /// Routine informational message.
    Info,
    /// Notable but expected event (e.g. a reload).
    Notice,
    /// Recoverable anomaly.
    Warning,
    /// An operation failed.
    Err,
    /// A failure that may affect call safety (e.g. loop guard tripped).
    Crit,
}

impl LogLevel {
    /// The literal level name as it appears in a log line.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Err => "err",
            LogLevel::Crit => "crit",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Emit a module-tagged line at the given [`LogLevel`].
///
/// `module` is the component name (`"config"`, `"dispatch"`, `"flow"`,
/// ...); `message` is the line body. Maps onto the nearest `tracing`
/// macro so existing `tracing-subscriber` formatting/filtering applies,
/// while `level_name` preserves the original six-level taxonomy.
pub fn log(level: LogLevel, module: &str, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(level_name = level.name(), module, "{message}"),
        LogLevel::Info => tracing::info!(level_name = level.name(), module, "{message}"),
        LogLevel::Notice => tracing::info!(level_name = level.name(), module, "{message}"),
        LogLevel::Warning => tracing::warn!(level_name = level.name(), module, "{message}"),
        LogLevel::Err => tracing::error!(level_name = level.name(), module, "{message}"),
        LogLevel::Crit => tracing::error!(level_name = level.name(), module, "{message}"),
    }
}
