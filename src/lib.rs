#![doc(test(attr(deny(warnings))))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! A bootstrap for long-running service nodes.
//!
//! Every node process goes through the same dull motions before it gets to do anything useful. It
//! reads the command line to find its configuration file, loads it, sets up logging, checks the
//! options it needs are there and of the right types, writes a pid file and handles the
//! termination signals. This crate does all that, leaving only the node itself to be written.
//!
//! A node is two things:
//!
//! * The [`Node`] itself. It is constructed from the [`Options`] and asked to [shut
//!   down][Node::shutdown] once the process is terminated.
//! * The [`NodeFactory`]. It tells the bootstrap where to look for the configuration file by
//!   default and may add its own entries to the [`Options`].
//!
//! The node runs in a single-threaded event loop (tokio current-thread runtime driving a
//! [`LocalSet`][tokio::task::LocalSet]). It can spawn its tasks through the [`Reactor`] handle
//! found in the options. Errors of these tasks are fatal.
//!
//! # Configuration
//!
//! The configuration is a YAML file with a mapping at the top level. These keys are consumed by
//! the bootstrap itself:
//!
//! | Key             | Type    | Required | Meaning                                            |
//! |-----------------|---------|----------|----------------------------------------------------|
//! | `log_file`      | string  | no       | Daily log files `<log_file>.YYYYMMDD`, not stdout. |
//! | `log_level`     | string  | no       | `DEBUG`, `INFO` (default), `WARN`, `ERROR`, `FATAL` |
//! | `index`         | integer | no       |                                                    |
//! | `base_dir`      | string  | yes      |                                                    |
//! | `ip_route`      | string  | no       |                                                    |
//! | `node_id`       | string  | yes      |                                                    |
//! | `mbus`          | string  | yes      | The message bus address.                           |
//! | `local_db`      | string  | yes      | Path to the local database.                        |
//! | `migration_nfs` | string  | no       |                                                    |
//! | `pid`           | string  | yes      | Where to write the pid file.                       |
//!
//! Anything else is left for the [`NodeFactory::additional_config`] to pick up, see the
//! [`validation`] module.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use log::info;
//! use nodebin::prelude::*;
//!
//! struct Greeter;
//!
//! impl Node for Greeter {
//!     fn new(options: Options) -> Result<Self, AnyError> {
//!         let greeting = options.get::<String>("greeting").cloned().unwrap_or_default();
//!         options.reactor().spawn(async move {
//!             info!("{}", greeting);
//!             Ok::<_, AnyError>(())
//!         });
//!         Ok(Greeter)
//!     }
//!
//!     fn shutdown(&mut self) {
//!         info!("Bye");
//!     }
//! }
//!
//! struct GreeterFactory;
//!
//! impl NodeFactory for GreeterFactory {
//!     type Node = Greeter;
//!
//!     fn default_config_file(&self) -> PathBuf {
//!         "/etc/greeter.yml".into()
//!     }
//!
//!     fn additional_config(
//!         &self,
//!         options: Options,
//!         cfg: &RawConfig,
//!     ) -> Result<Options, PropertyError> {
//!         let greeting: String = cfg.required("greeting")?;
//!         Ok(options.with("greeting", greeting))
//!     }
//! }
//!
//! fn main() {
//!     NodeBin::new(GreeterFactory).run();
//! }
//! ```

pub mod app;
pub mod bootstrap;
pub mod cfg_loader;
pub mod error;
pub mod guide;
pub mod logging;
pub mod node;
pub mod options;
pub mod pid;
pub mod runtime;
pub mod terminate_guard;
pub mod utils;
pub mod validation;
pub mod value;

pub use crate::app::App;
pub use crate::bootstrap::{NodeBin, StartupError};
pub use crate::error::AnyError;
pub use crate::node::{Node, NodeFactory};
pub use crate::options::Options;
pub use crate::runtime::{Reactor, Terminator};
pub use crate::validation::{Property, PropertyError};
pub use crate::value::{Kind, RawConfig, Value};

/// The things usually needed to write a node.
pub mod prelude {
    pub use super::{
        AnyError, Node, NodeBin, NodeFactory, Options, PropertyError, RawConfig, Reactor, Value,
    };
}
