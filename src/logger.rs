//! Verbosity-filtered logging for the manager.
//!
//! All records go through the [`log`] facade with the `datafile_manager` target. [`ManagerLogger`]
//! additionally drops records that are more verbose than the level configured in
//! [`ManagerConfig::log_level`](crate::ManagerConfig::log_level), so one manager can be quieter
//! than the rest of the application.
use log::{Level, LevelFilter};

pub(crate) const TARGET: &str = "datafile_manager";

/// Logger handed to the evaluation engine factory and used by the manager itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerLogger {
    level: LevelFilter,
}

impl ManagerLogger {
    /// Create a logger that passes records at `level` or less verbose.
    pub fn new(level: LevelFilter) -> ManagerLogger {
        ManagerLogger { level }
    }

    /// Configured verbosity.
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Returns `true` if a record at `level` would be emitted.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level && log::log_enabled!(target: TARGET, level)
    }

    /// Log a plain message at `level`.
    pub fn log(&self, level: Level, message: &str) {
        if self.enabled(level) {
            log::log!(target: TARGET, level, "{}", message);
        }
    }
}

impl Default for ManagerLogger {
    fn default() -> ManagerLogger {
        ManagerLogger::new(LevelFilter::Debug)
    }
}

/// Log through a [`ManagerLogger`], supporting the `log` key-value syntax.
///
/// ```ignore
/// manager_log!(logger, Level::Warn, url = url.as_str(); "fetch failed: {}", err);
/// ```
macro_rules! manager_log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let level: ::log::Level = $level;
        if $logger.enabled(level) {
            ::log::log!(target: $crate::logger::TARGET, level, $($arg)+);
        }
    }};
}
pub(crate) use manager_log;


#[cfg(test)]
mod tests {
    use log::{Level, LevelFilter};

    use super::ManagerLogger;

    #[test]
    fn defaults_to_debug() {
        assert_eq!(ManagerLogger::default().level(), LevelFilter::Debug);
    }

    #[test]
    fn drops_records_above_configured_level() {
        let logger = ManagerLogger::new(LevelFilter::Warn);
        assert!(!logger.enabled(Level::Info));
        assert!(!logger.enabled(Level::Debug));
    }

    #[test]
    fn off_drops_everything() {
        let logger = ManagerLogger::new(LevelFilter::Off);
        assert!(!logger.enabled(Level::Error));
    }
}
