use crate::debug_trace;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Routes the standard logging macros to the debug console.
///
/// Holds no state beyond the level threshold, so callers keep one in a
/// `static` and hand out the `&'static` reference the logging framework
/// requires; no allocation happens at any point.
pub struct DebugConLogger {
    max_level: LevelFilter,
}

impl DebugConLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Installs this logger as the global one. Call once during early
    /// processor bring-up.
    ///
    /// # Errors
    /// [`SetLoggerError`] if a global logger is already installed.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl Log for DebugConLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        debug_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        // Nothing buffers.
    }
}
