//! Error handling utilities.

use std::error::Error;

use err_context::prelude::*;
use log::{Level, Log, Record};

use crate::logging::FATAL_TARGET;

/// A wrapper type for any error.
///
/// This is just a type alias for boxed standard error. Any errors go and this is guaranteed to be
/// fully compatible.
pub type AnyError = Box<dyn Error + Send + Sync>;

/// Logs an error as fatal, one message per cause, and flushes the log.
///
/// The messages are error-level records on the [`FATAL_TARGET`] target. This is used both by the
/// [`FatalHandler`][crate::runtime::FatalHandler] of a running node and for the startup failures
/// that happen after the logger is installed.
pub fn log_fatal(log: &dyn Log, e: &AnyError) {
    for cause in e.chain() {
        log.log(
            &Record::builder()
                .args(format_args!("{}", cause))
                .level(Level::Error)
                .target(FATAL_TARGET)
                .module_path(Some(module_path!()))
                .build(),
        );
    }
    log.flush();
}

#[cfg(test)]
mod tests {
    use std::fmt::{Display, Formatter, Result as FmtResult};
    use std::sync::Mutex;

    use log::Metadata;

    use super::*;

    #[derive(Copy, Clone, Debug)]
    struct Dummy;

    impl Display for Dummy {
        fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
            write!(fmt, "Dummy error")
        }
    }

    impl Error for Dummy {}

    #[derive(Default)]
    struct Collect {
        records: Mutex<Vec<(Level, String, String)>>,
        flushed: Mutex<bool>,
    }

    impl Log for Collect {
        fn enabled(&self, _: &Metadata) -> bool {
            true
        }
        fn log(&self, record: &Record) {
            self.records.lock().unwrap().push((
                record.level(),
                record.target().to_owned(),
                record.args().to_string(),
            ));
        }
        fn flush(&self) {
            *self.flushed.lock().unwrap() = true;
        }
    }

    #[test]
    fn fatal_line_per_cause() {
        let log = Collect::default();
        log_fatal(&log, &Dummy.context("Another level").into());
        let records = log.records.into_inner().unwrap();
        assert_eq!(
            vec![
                (Level::Error, "fatal".to_owned(), "Another level".to_owned()),
                (Level::Error, "fatal".to_owned(), "Dummy error".to_owned()),
            ],
            records
        );
        assert!(log.flushed.into_inner().unwrap());
    }
}
