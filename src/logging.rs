//! Logging configuration.
//!
//! The node logs through the [`log`] facade. The backend is assembled from two optional
//! configuration keys:
//!
//! * `log_file`: Path of the log file. The log is rotated daily, each day goes into its own file
//!   named `<log_file>.YYYYMMDD` (by the local date). Standard output is used if not set.
//! * `log_level`: One of `DEBUG`, `INFO`, `WARN`, `ERROR` or `FATAL` (case sensitive). `INFO` is
//!   used if not set. Any other string turns into the [`Unknown`][Severity::Unknown] severity,
//!   which lets nothing through.
//!
//! The [`log`] crate has no fatal level. Fatal messages are error-level records with the
//! [`FATAL_TARGET`] target, they are printed as `FATAL` and are the only thing that passes with
//! the [`Fatal`][Severity::Fatal] severity.

use std::io;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use err_context::prelude::*;
use fern::{DateBased, Dispatch};
use log::{debug, trace, Level, LevelFilter, Log, Metadata, Record};

use crate::error::AnyError;
use crate::validation::PropertyError;
use crate::value::RawConfig;

/// The log target for fatal messages.
pub const FATAL_TARGET: &str = "fatal";

const DAILY_SUFFIX: &str = ".%Y%m%d";

fn dated_file(prefix: &Path, date: NaiveDate) -> PathBuf {
    let mut name = OsString::from(prefix);
    name.push(date.format(DAILY_SUFFIX).to_string());
    name.into()
}

/// Verbosity of the log, as read from the `log_level` option.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Severity {
    /// Everything is logged.
    Debug,
    /// Info and above.
    Info,
    /// Warnings and above.
    Warn,
    /// Errors and fatal messages.
    Error,
    /// Only the fatal messages.
    Fatal,
    /// An unrecognized level name. Nothing is logged.
    Unknown,
}

impl Severity {
    /// Maps the configured name to the severity.
    ///
    /// This never fails, unrecognized names are [`Unknown`][Severity::Unknown].
    pub fn from_name(name: &str) -> Self {
        match name {
            "DEBUG" => Severity::Debug,
            "INFO" => Severity::Info,
            "WARN" => Severity::Warn,
            "ERROR" => Severity::Error,
            "FATAL" => Severity::Fatal,
            _ => Severity::Unknown,
        }
    }

    // The filter for ordinary targets. The fatal target gets LevelFilter::Error unless Unknown.
    fn level_filter(self) -> LevelFilter {
        match self {
            Severity::Debug => LevelFilter::Debug,
            Severity::Info => LevelFilter::Info,
            Severity::Warn => LevelFilter::Warn,
            Severity::Error => LevelFilter::Error,
            Severity::Fatal | Severity::Unknown => LevelFilter::Off,
        }
    }

    fn max_level(self) -> LevelFilter {
        match self {
            Severity::Fatal => LevelFilter::Error,
            other => other.level_filter(),
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

/// Where the log goes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogDestination {
    /// Append to daily files, this is the common prefix of their names.
    File(PathBuf),
    /// The standard output.
    StdOut,
}

/// The logging part of the configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogConfig {
    /// Where to log.
    pub destination: LogDestination,
    /// How much to log.
    pub severity: Severity,
}

impl LogConfig {
    /// Reads the `log_file` and `log_level` options.
    pub fn from_config(cfg: &RawConfig) -> Result<Self, PropertyError> {
        let destination = cfg
            .optional::<String>("log_file")?
            .map(|file| LogDestination::File(file.into()))
            .unwrap_or(LogDestination::StdOut);
        let severity = cfg
            .optional::<String>("log_level")?
            .map(|name| Severity::from_name(&name))
            .unwrap_or_default();
        Ok(LogConfig {
            destination,
            severity,
        })
    }

    fn dispatch(&self) -> Result<Dispatch, AnyError> {
        trace!("Creating logger for {:?}", self);
        let logger = Dispatch::new()
            .format(|out, message, record| {
                let level = if record.target() == FATAL_TARGET {
                    "FATAL"
                } else {
                    record.level().as_str()
                };
                out.finish(format_args!(
                    "{} {:5} {:30} {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    level,
                    record.target(),
                    message,
                ))
            })
            .level(self.severity.level_filter());
        let logger = if self.severity == Severity::Unknown {
            logger
        } else {
            logger.level_for(FATAL_TARGET, LevelFilter::Error)
        };
        match self.destination {
            LogDestination::File(ref prefix) => {
                // The dated file is opened lazily, on the first message. Fail early instead.
                if let Some(today) = self.current_file() {
                    fern::log_file(&today).with_context(|_| {
                        format!("Failed to open log file {}", today.display())
                    })?;
                }
                let daily = DateBased::new(prefix.to_string_lossy().into_owned(), DAILY_SUFFIX);
                Ok(logger.chain(daily))
            }
            LogDestination::StdOut => Ok(logger.chain(io::stdout())),
        }
    }

    /// The file the log goes to right now, if logging into files.
    pub fn current_file(&self) -> Option<PathBuf> {
        match self.destination {
            LogDestination::File(ref prefix) => {
                Some(dated_file(prefix, Local::now().naive_local().date()))
            }
            LogDestination::StdOut => None,
        }
    }

    /// Creates the logger.
    ///
    /// This doesn't install it, see [`Logger::install`].
    pub fn create(&self) -> Result<Logger, AnyError> {
        let (_, log) = self.dispatch()?.into_log();
        Ok(Logger {
            inner: Arc::from(log),
            severity: self.severity,
        })
    }
}

/// A handle to the configured logger.
///
/// Cheap to clone, all the clones share the same backend. Once [installed][Logger::install], the
/// usual [`log`] macros go through it, but it can also be used directly as a [`Log`].
#[derive(Clone)]
pub struct Logger {
    inner: Arc<dyn Log>,
    severity: Severity,
}

impl Logger {
    /// The severity this logger was configured with.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Would an ordinary message of this level get logged?
    pub fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(
            &Metadata::builder()
                .level(level)
                .target(module_path!())
                .build(),
        )
    }

    /// Would a fatal message get logged?
    pub fn fatal_enabled(&self) -> bool {
        self.inner.enabled(
            &Metadata::builder()
                .level(Level::Error)
                .target(FATAL_TARGET)
                .build(),
        )
    }

    /// Makes this the process-wide logger.
    ///
    /// Replaces whatever logger was installed before.
    pub fn install(&self) {
        let _ = log_reroute::init();
        log_reroute::reroute(self.clone());
        log::set_max_level(self.severity.max_level());
        debug!("Installed logger with {:?} severity", self.severity);
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }
    fn log(&self, record: &Record) {
        self.inner.log(record)
    }
    fn flush(&self) {
        self.inner.flush()
    }
}
