//! The event loop and the handles into it.
//!
//! The node runs inside a single-threaded tokio runtime, driving a [`LocalSet`], so the node's
//! tasks don't have to be [`Send`]. Two channels lead into the loop:
//!
//! * Faults, through the [`Reactor`]. Any error reported there (or returned or panicked out of a
//!   task spawned through it) ends up in the [`FatalHandler`] and terminates the process.
//! * Termination requests, through the [`Terminator`]. These come either from the signal thread
//!   or from whoever holds the terminator (tests, mostly). They lead to an orderly shutdown.

use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::future::Future;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use err_context::prelude::*;
use log::{debug, trace};
use signal_hook::iterator::{Handle, Signals};
use tokio::runtime::Builder;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{self, LocalSet};

use crate::error::{self, AnyError};
use crate::logging::Logger;

/// A task spawned through the [`Reactor`] panicked.
#[derive(Clone, Debug)]
pub struct TaskPanicked(String);

impl Display for TaskPanicked {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(fmt, "Task panicked: {}", self.0)
    }
}

impl Error for TaskPanicked {}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<unknown payload>".to_owned()
    }
}

/// The node's handle to the event loop.
///
/// Available from the [`Options`][crate::Options]. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Reactor {
    faults: UnboundedSender<AnyError>,
}

pub(crate) struct Faults(UnboundedReceiver<AnyError>);

impl Faults {
    pub(crate) async fn next(&mut self) -> Option<AnyError> {
        self.0.recv().await
    }
}

impl Reactor {
    pub(crate) fn new() -> (Self, Faults) {
        let (faults, receiver) = mpsc::unbounded_channel();
        (Reactor { faults }, Faults(receiver))
    }

    /// Runs a task on the event loop.
    ///
    /// If the task returns an error or panics, it is reported as a fatal fault. The task is
    /// dropped unfinished if the loop shuts down before it completes.
    ///
    /// # Panics
    ///
    /// If called outside of the event loop, for example before the node is constructed.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Result<(), AnyError>> + 'static,
    {
        let handle = task::spawn_local(task);
        let faults = self.faults.clone();
        task::spawn_local(async move {
            let fault: AnyError = match handle.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e,
                Err(e) if e.is_panic() => TaskPanicked(panic_message(e.into_panic())).into(),
                // Cancelled, the loop is going down anyway
                Err(_) => return,
            };
            let _ = faults.send(fault);
        });
    }

    /// Reports an unrecoverable error.
    ///
    /// The error gets logged as fatal and the process terminates without calling the node's
    /// shutdown.
    pub fn fail<E: Into<AnyError>>(&self, error: E) {
        if self.faults.send(error.into()).is_err() {
            debug!("Fault reported after the event loop terminated");
        }
    }
}

/// Why the event loop is asked to terminate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Termination {
    /// A termination signal arrived.
    Signal(c_int),
    /// Someone called [`Terminator::terminate`].
    Requested,
}

/// A handle to request an orderly shutdown of the node.
///
/// Requests may come any number of times and from any thread, the node is shut down only once.
#[derive(Clone, Debug)]
pub struct Terminator {
    requests: UnboundedSender<Termination>,
    done: Arc<AtomicBool>,
}

pub(crate) struct Requests(UnboundedReceiver<Termination>);

impl Requests {
    pub(crate) async fn next(&mut self) -> Option<Termination> {
        self.0.recv().await
    }
}

impl Terminator {
    pub(crate) fn new() -> (Self, Requests) {
        let (requests, receiver) = mpsc::unbounded_channel();
        let terminator = Terminator {
            requests,
            done: Arc::new(AtomicBool::new(false)),
        };
        (terminator, Requests(receiver))
    }

    fn request(&self, termination: Termination) {
        if self.requests.send(termination).is_err() {
            trace!("Termination {:?} requested after the loop is gone", termination);
        }
    }

    /// Asks the node to shut down.
    pub fn terminate(&self) {
        self.request(Termination::Requested);
    }

    /// Has the shutdown already started?
    pub fn is_terminated(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Claims the shutdown.
    ///
    /// Returns `true` exactly once, for the first caller.
    pub(crate) fn begin_shutdown(&self) -> bool {
        !self.done.swap(true, Ordering::SeqCst)
    }
}

/// The helper thread turning SIGINT and SIGTERM into termination requests.
///
/// Stops and joins the thread on drop.
pub(crate) struct SignalListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalListener {
    pub(crate) fn install(terminator: Terminator) -> Result<Self, AnyError> {
        let mut signals = Signals::new(&[libc::SIGINT, libc::SIGTERM])
            .context("Failed to register signal handlers")?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("nodebin-signals".to_owned())
            .spawn(move || {
                debug!("Starting signal processing");
                for signal in signals.forever() {
                    debug!("Received signal {}", signal);
                    terminator.request(Termination::Signal(signal));
                }
                debug!("Terminating the signal thread");
            })
            .context("Failed to start the signal thread")?;
        Ok(SignalListener {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("The signal thread panicked");
            }
        }
    }
}

/// Runs the future to completion on a fresh current-thread runtime.
///
/// Whatever tasks are left unfinished once it completes are dropped.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, AnyError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the event loop")?;
    let local = LocalSet::new();
    Ok(local.block_on(&runtime, future))
}

/// Logs unrecoverable errors.
///
/// Every cause in the chain is logged as a fatal message. The handler writes through the logger
/// it was created with, even if the process-wide logger was replaced in the meantime.
#[derive(Clone)]
pub struct FatalHandler {
    logger: Logger,
}

impl FatalHandler {
    pub(crate) fn new(logger: Logger) -> Self {
        FatalHandler { logger }
    }

    /// Logs the error with its causes.
    pub fn handle(&self, error: &AnyError) {
        error::log_fatal(&self.logger, error);
    }
}
