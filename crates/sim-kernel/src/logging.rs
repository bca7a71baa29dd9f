//! Stderr logger for hosts running the simulated kernel.

use std::io::Write;

/// Environment variable holding the maximum log level, e.g. `debug`.
pub const LOG_LEVEL_ENV: &str = "SIM_KERNEL_LOG";

const CLEAR_FORMAT: &str = "\x1b[0m";

/// Dummy type to help us implement a logger using the `log` crate.
struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let color_code = match record.level() {
                log::Level::Error => "\x1b[31m",
                log::Level::Warn => "\x1b[33m",
                log::Level::Info => "\x1b[32m",
                // White is actually kinda grey. Bright white is white.
                log::Level::Debug | log::Level::Trace => "\x1b[37m",
            };

            // Nowhere to report a failed write to stderr.
            let _ = writeln!(
                std::io::stderr().lock(),
                "{color_code}[{}]{CLEAR_FORMAT} {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Installs the logger. Only the first call in a process has any effect, so
/// every test can call this.
pub fn init() {
    if log::set_logger(&LOGGER).is_err() {
        return;
    }

    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(log::LevelFilter::Warn);
    log::set_max_level(level);
    log::debug!("Logging initialized at {level}");
}
