//! A termination RAII guard for test purposes.
//!
//! See the [testing guide] for details.
//!
//! [testing guide]: crate::guide::testing

use std::thread::{self, JoinHandle};

use crate::error::AnyError;
use crate::runtime::Terminator;

/// The termination RAII guard for test purposes.
///
/// See the [testing guide] for details of use. Created by [App::run_test][run_test].
///
/// Note that this will shut down (call `terminate`) when dropped and wait for the termination to
/// happen. It'll then check that everything went successfully and panic if not. This is meant for
/// tests, so it's desired behaviour.
///
/// # Panics
///
/// The **destructor** may panic if the node fails or its thread panics. See above.
///
/// [testing guide]: crate::guide::testing
/// [run_test]: crate::app::App::run_test
pub struct TerminateGuard {
    terminator: Terminator,
    bg: Option<JoinHandle<Result<(), AnyError>>>,
}

impl TerminateGuard {
    pub(crate) fn new(terminator: Terminator, bg: JoinHandle<Result<(), AnyError>>) -> Self {
        Self {
            terminator,
            bg: Some(bg),
        }
    }

    /// Access to the terminator of the running node.
    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    /// Waits for the node to end on its own and returns how it ended.
    ///
    /// Unlike dropping the guard, this doesn't request the termination. It is for checking nodes
    /// that are expected to fail or that get terminated through some other means.
    pub fn join(mut self) -> Result<(), AnyError> {
        match self.bg.take() {
            Some(bg) => bg
                .join()
                .unwrap_or_else(|_| Err("The node thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for TerminateGuard {
    fn drop(&mut self) {
        let bg = match self.bg.take() {
            Some(bg) => bg,
            None => return,
        };
        self.terminator.terminate();
        let result = bg.join();
        if !thread::panicking() {
            result
                .expect("Node test thread panicked")
                .expect("Test node terminated with an error");
        }
    }
}
