// Minimal stderr logger for the `log` facade. Stdout is left to the final report.

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[{:>5}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init(level: LevelFilter) {
    // A second init (tests) keeps the first logger.
    let _ = log::set_boxed_logger(Box::new(StderrLogger));
    log::set_max_level(level);
}
