//! The extension points implemented by a concrete node.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use crate::cfg_loader;
use crate::error::AnyError;
use crate::options::Options;
use crate::validation::PropertyError;
use crate::value::RawConfig;

/// The long-running service object.
///
/// The node is constructed inside the event loop, so [`new`][Node::new] may spawn tasks through
/// the [`Reactor`][crate::Reactor] available in the options.
pub trait Node: Sized + 'static {
    /// Creates the node from the complete options.
    ///
    /// An error here is fatal.
    fn new(options: Options) -> Result<Self, AnyError>;

    /// Stops the node.
    ///
    /// Called at most once, on a termination request, right before the event loop stops. Any
    /// tasks still running on the loop are dropped afterwards.
    fn shutdown(&mut self);
}

/// Describes how to bootstrap a concrete node.
pub trait NodeFactory {
    /// The node to run.
    type Node: Node;

    /// The configuration file used when none is given on the command line.
    fn default_config_file(&self) -> PathBuf;

    /// Adds node-specific entries to the options.
    ///
    /// Called after the fixed options are extracted, with the whole configuration file. The
    /// default leaves the options as they are.
    fn additional_config(
        &self,
        options: Options,
        _cfg: &RawConfig,
    ) -> Result<Options, PropertyError> {
        Ok(options)
    }

    /// The program name shown in the usage.
    fn name(&self) -> String {
        cfg_loader::program_name(env::args_os().next().as_ref())
    }
}

/// The [`Node::new`] failed.
#[derive(Debug)]
pub struct ConstructionFailed(pub(crate) AnyError);

impl Display for ConstructionFailed {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(fmt, "Failed to construct the node")
    }
}

impl Error for ConstructionFailed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.0)
    }
}
