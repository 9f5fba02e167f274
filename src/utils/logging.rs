// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub struct LoggingUtils;

impl LoggingUtils {
    pub fn init_logger(level: LevelFilter, use_color: bool) {
        let logger = Box::new(ColoredLogger::new(level, use_color));
        log::set_boxed_logger(logger).ok();
        log::set_max_level(level);
    }

    pub fn init_logger_with_file(level: LevelFilter, file_path: &Path) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(file_path)?;

        let logger = Box::new(FileLogger::new(level, file));
        log::set_boxed_logger(logger).ok();
        log::set_max_level(level);
        Ok(())
    }

    /// Defers to `env_logger` when `RUST_LOG` is set.
    pub fn init_from_env() -> bool {
        if std::env::var_os("RUST_LOG").is_some() {
            env_logger::try_init().is_ok()
        } else {
            false
        }
    }

    pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

struct ColoredLogger {
    level: LevelFilter,
    use_color: bool,
}

impl ColoredLogger {
    fn new(level: LevelFilter, use_color: bool) -> Self {
        Self { level, use_color }
    }

    fn format_level(&self, level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

impl Log for ColoredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if self.use_color {
            let target = format!("[{}]", record.target());
            eprintln!("{} {} {}", self.format_level(record.level()), target.dimmed(), record.args());
        } else {
            eprintln!("{:5} [{}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

struct FileLogger {
    level: LevelFilter,
    file: Mutex<File>,
}

impl FileLogger {
    fn new(level: LevelFilter, file: File) -> Self {
        Self {
            level,
            file: Mutex::new(file),
        }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format!(
                "{} {:5} [{}] {}\n",
                unix_timestamp(),
                record.level(),
                record.target(),
                record.args()
            );
            let _ = self.file.lock().write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        let _ = self.file.lock().flush();
    }
}

fn unix_timestamp() -> String {
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:03}", duration.as_secs(), duration.subsec_millis())
}

/// Logs the lifetime of a phase at debug level when dropped.
pub struct ScopedTimer {
    name: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &str) -> Self {
        log::debug!("[TIMER] {} started", name);
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        log::debug!("[TIMER] {} took {:.2}ms", self.name, elapsed.as_secs_f64() * 1000.0);
    }
}

pub fn scoped_timer(name: &str) -> ScopedTimer {
    ScopedTimer::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(LoggingUtils::level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(LoggingUtils::level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(LoggingUtils::level_from_verbosity(9), LevelFilter::Trace);
    }
}
