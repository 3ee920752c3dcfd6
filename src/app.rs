//! The running part of the node's life.
//!
//! Once the bootstrap is done, all that's left is the [`App`]. It constructs the node inside the
//! event loop and keeps the loop going until either a termination is requested or a fatal fault
//! happens.

use std::marker::PhantomData;
use std::process;
use std::thread;

use log::{debug, info};

use crate::error::AnyError;
use crate::node::{ConstructionFailed, Node};
use crate::options::Options;
use crate::runtime::{self, FatalHandler, Faults, Requests, SignalListener, Terminator};
use crate::terminate_guard::TerminateGuard;

/// The bootstrapped, but not yet running, node.
///
/// Created by [`NodeBin::build`][crate::NodeBin::build]. The node itself doesn't exist yet, only
/// its [`Options`].
pub struct App<N> {
    options: Options,
    fatal: FatalHandler,
    faults: Faults,
    terminator: Terminator,
    requests: Requests,
    _node: PhantomData<fn() -> N>,
}

impl<N: Node> App<N> {
    pub(crate) fn new(options: Options, fatal: FatalHandler, faults: Faults) -> Self {
        let (terminator, requests) = Terminator::new();
        App {
            options,
            fatal,
            faults,
            terminator,
            requests,
            _node: PhantomData,
        }
    }

    /// The options the node will be constructed with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// A handle to shut the node down once it runs.
    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    /// Runs the node until terminated.
    ///
    /// SIGINT and SIGTERM are handled once the node is constructed, both lead to an orderly
    /// shutdown and `Ok(())`. A fatal fault is logged and returned as an error, without shutting
    /// the node down.
    pub fn run(self) -> Result<(), AnyError> {
        self.run_inner(true)
    }

    /// Runs the node and exits the process once it terminates.
    ///
    /// The exit code is 0 after an orderly shutdown, 1 after a fatal fault.
    pub fn run_term(self) -> ! {
        match self.run() {
            Ok(()) => {
                debug!("Terminated successfully");
                log::logger().flush();
                process::exit(0);
            }
            Err(_) => process::exit(1),
        }
    }

    /// Runs the node in a background thread, for tests.
    ///
    /// Signal handlers are not installed. The returned guard terminates the node and checks it
    /// ended successfully when dropped.
    pub fn run_test(self) -> TerminateGuard {
        let terminator = self.terminator.clone();
        let bg = thread::spawn(move || self.run_inner(false));
        TerminateGuard::new(terminator, bg)
    }

    fn run_inner(self, signals: bool) -> Result<(), AnyError> {
        let App {
            options,
            fatal,
            faults,
            terminator,
            requests,
            ..
        } = self;
        let result = runtime::block_on(run_loop::<N>(
            options, faults, terminator, requests, signals,
        ))
        .and_then(|result| result);
        if let Err(ref e) = result {
            fatal.handle(e);
        }
        result
    }
}

async fn run_loop<N: Node>(
    options: Options,
    mut faults: Faults,
    terminator: Terminator,
    mut requests: Requests,
    signals: bool,
) -> Result<(), AnyError> {
    // Keeps the fault channel open even if the node drops its reactor.
    let _reactor = options.reactor().clone();
    debug!("Constructing the node");
    let mut node = N::new(options).map_err(ConstructionFailed)?;
    let _signals = if signals {
        Some(SignalListener::install(terminator.clone())?)
    } else {
        None
    };
    info!("Node is running");
    tokio::select! {
        Some(fault) = faults.next() => Err(fault),
        Some(termination) = requests.next() => {
            debug!("Terminating on {:?}", termination);
            if terminator.begin_shutdown() {
                info!("Shutting down the node");
                node.shutdown();
            }
            Ok(())
        }
        else => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::logging::{LogConfig, LogDestination, Severity};
    use crate::runtime::Reactor;
    use crate::value::{RawConfig, Value};

    struct Counting {
        shutdowns: Arc<AtomicUsize>,
    }

    impl Node for Counting {
        fn new(mut options: Options) -> Result<Self, AnyError> {
            let shutdowns = options
                .take::<Arc<AtomicUsize>>("shutdowns")
                .ok_or("Missing shutdown counter")?;
            Ok(Counting { shutdowns })
        }
        fn shutdown(&mut self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn app(shutdowns: Option<Arc<AtomicUsize>>) -> App<Counting> {
        let logger = LogConfig {
            destination: LogDestination::StdOut,
            severity: Severity::Unknown,
        }
        .create()
        .unwrap();
        let cfg: BTreeMap<String, Value> = ["base_dir", "node_id", "mbus", "local_db"]
            .iter()
            .map(|key| ((*key).to_owned(), Value::from("x")))
            .collect();
        let (reactor, faults) = Reactor::new();
        let mut options = Options::extract(&RawConfig::from(cfg), logger.clone(), reactor).unwrap();
        if let Some(shutdowns) = shutdowns {
            options.insert("shutdowns", shutdowns);
        }
        App::new(options, FatalHandler::new(logger), faults)
    }

    #[test]
    fn terminate_runs_shutdown_once() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let app = app(Some(Arc::clone(&shutdowns)));
        let terminator = app.terminator().clone();
        terminator.terminate();
        terminator.terminate();
        app.run_inner(false).unwrap();
        assert_eq!(1, shutdowns.load(Ordering::SeqCst));
        assert!(terminator.is_terminated());
        terminator.terminate();
    }

    #[test]
    fn guard_terminates_on_drop() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let guard = app(Some(Arc::clone(&shutdowns))).run_test();
        drop(guard);
        assert_eq!(1, shutdowns.load(Ordering::SeqCst));
    }

    #[test]
    fn construction_failure() {
        let err = app(None).run_inner(false).unwrap_err();
        assert_eq!("Failed to construct the node", err.to_string());
        assert_eq!(
            "Missing shutdown counter",
            err.source().unwrap().to_string()
        );
    }

    #[test]
    fn fault_skips_shutdown() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let app = app(Some(Arc::clone(&shutdowns)));
        app.options().reactor().fail("Something exploded");
        let err = app.run_inner(false).unwrap_err();
        assert_eq!("Something exploded", err.to_string());
        assert_eq!(0, shutdowns.load(Ordering::SeqCst));
    }

    #[test]
    fn guard_join_reports_fault() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let app = app(Some(Arc::clone(&shutdowns)));
        app.options().reactor().fail("Gave up");
        let err = app.run_test().join().unwrap_err();
        assert_eq!("Gave up", err.to_string());
        assert_eq!(0, shutdowns.load(Ordering::SeqCst));
    }

    #[test]
    fn guard_join_after_terminate() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let guard = app(Some(Arc::clone(&shutdowns))).run_test();
        guard.terminator().terminate();
        guard.join().unwrap();
        assert_eq!(1, shutdowns.load(Ordering::SeqCst));
    }
}
