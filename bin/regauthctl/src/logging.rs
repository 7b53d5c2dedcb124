//! Structured JSON logging to standard error.
use std::sync::Mutex;

use slog::o;
use slog::Drain;
use slog::FnValue;
use slog::IgnoreResult;
use slog::Logger;
use slog::OwnedKVList;
use slog::Record;

/// Alternative implementation of slog's [`LevelFilter`](slog::LevelFilter) with `Ok == ()`.
///
/// The default implementation wraps `D::Ok` into an [`Option`].
/// This makes it impossible to wrap a filtering drain into a [`Logger`].
#[derive(Debug, Clone)]
struct LevelFilter<D: Drain>(pub D, pub slog::Level);

impl<D: Drain> Drain for LevelFilter<D> {
    type Ok = ();
    type Err = D::Err;
    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        if record.level().is_at_least(self.1) {
            self.0.log(record, logger_values)?;
        }
        Ok(())
    }
}

/// Enumerate valid log verbosity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl From<LogLevel> for regauth_conf::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Critical => regauth_conf::LogLevel::Critical,
            LogLevel::Error => regauth_conf::LogLevel::Error,
            LogLevel::Warning => regauth_conf::LogLevel::Warning,
            LogLevel::Info => regauth_conf::LogLevel::Info,
            LogLevel::Debug => regauth_conf::LogLevel::Debug,
        }
    }
}

fn slog_level(level: regauth_conf::LogLevel) -> slog::Level {
    match level {
        regauth_conf::LogLevel::Critical => slog::Level::Critical,
        regauth_conf::LogLevel::Error => slog::Level::Error,
        regauth_conf::LogLevel::Warning => slog::Level::Warning,
        regauth_conf::LogLevel::Info => slog::Level::Info,
        regauth_conf::LogLevel::Debug => slog::Level::Debug,
    }
}

/// Configure a logger emitting JSON events to standard error.
///
/// Standard output is reserved for command results.
pub fn configure(level: regauth_conf::LogLevel) -> Logger {
    let drain = slog_json::Json::new(std::io::stderr())
        .set_newlines(true)
        .set_flush(true)
        .set_pretty(false)
        .add_default_keys()
        .build();
    let drain = Mutex::new(drain).map(IgnoreResult::new);
    let drain = LevelFilter(drain, slog_level(level));
    // rustc can't infer lifetimes correctly when using Record::module.
    #[allow(clippy::redundant_closure)]
    Logger::root(
        drain,
        o!(
            "module" => FnValue(|rinfo: &Record| rinfo.module()),
            "version" => env!("CARGO_PKG_VERSION"),
        ),
    )
}
