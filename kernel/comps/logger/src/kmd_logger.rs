// SPDX-License-Identifier: MPL-2.0

use core::sync::atomic::{AtomicBool, Ordering};

use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// The logger used by the kernel mmap device.
struct KmdLogger;

static LOGGER: KmdLogger = KmdLogger;

/// Whether `LOGGER` is the installed logger.
static INSTALLED: AtomicBool = AtomicBool::new(false);

impl log::Log for KmdLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            print_logs(record);
        }
    }

    fn flush(&self) {}
}

#[cfg(feature = "log_color")]
fn print_logs(record: &Record) {
    use owo_colors::Style;

    let target_style = Style::new().green();
    let record_style = Style::new().default_color();
    let level_style = match record.level() {
        log::Level::Error => Style::new().red(),
        log::Level::Warn => Style::new().bright_yellow(),
        log::Level::Info => Style::new().blue(),
        log::Level::Debug => Style::new().bright_green(),
        log::Level::Trace => Style::new().bright_black(),
    };

    super::_print(format_args!(
        "{:<5} {}: {}\n",
        level_style.style(record.level()),
        target_style.style(record.target()),
        record_style.style(record.args())
    ));
}

#[cfg(not(feature = "log_color"))]
fn print_logs(record: &Record) {
    super::_print(format_args!(
        "{:<5} {}: {}\n",
        record.level(),
        record.target(),
        record.args()
    ));
}

/// Installs the logger and sets the maximum log level.
///
/// The logger can only be installed once per program; later calls only
/// adjust the level. If another logger is already in place, the records go
/// to that logger and its level is left untouched.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    match log::set_logger(&LOGGER) {
        Ok(()) => INSTALLED.store(true, Ordering::Release),
        Err(err) if !INSTALLED.load(Ordering::Acquire) => return Err(err),
        Err(_) => {}
    }
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    struct OtherLogger;

    impl log::Log for OtherLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, _record: &Record) {}

        fn flush(&self) {}
    }

    static OTHER_LOGGER: OtherLogger = OtherLogger;

    #[test]
    fn foreign_logger_is_left_alone() {
        log::set_logger(&OTHER_LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);

        assert!(init(LevelFilter::Warn).is_err());
        assert!(init(LevelFilter::Error).is_err());
        assert_eq!(log::max_level(), LevelFilter::Trace);
    }
}
