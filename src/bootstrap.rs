//! The startup sequence.
//!
//! [`NodeBin`] walks the node through everything that happens before it runs:
//!
//! 1. The command line is parsed, possibly printing the help.
//! 2. The configuration file is loaded.
//! 3. Logging is configured and installed.
//! 4. The fixed [`Options`] are extracted and the [`NodeFactory`] gets to add its own.
//! 5. The fatal error handler is prepared.
//! 6. The pid file is written.
//!
//! The result is an [`App`], ready to construct and run the node. Any failure aborts the sequence
//! before the node exists. Failures before the logger is installed go to the standard error
//! output, the later ones are logged as fatal.

use std::env;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::process;

use err_context::prelude::*;
use log::debug;
use structopt::clap::{Error as ClapError, ErrorKind};

use crate::app::App;
use crate::cfg_loader::{self, ConfigReadError};
use crate::error::{self, AnyError};
use crate::logging::LogConfig;
use crate::node::NodeFactory;
use crate::options::Options;
use crate::pid::PidFile;
use crate::runtime::{FatalHandler, Reactor};
use crate::validation::PropertyError;

/// The startup sequence failed.
#[derive(Debug)]
#[non_exhaustive]
pub enum StartupError {
    /// The command line is wrong, or help was asked for.
    Usage(ClapError),
    /// The configuration file couldn't be read.
    Config(ConfigReadError),
    /// Logging couldn't be set up.
    ///
    /// This includes `log_file` or `log_level` of a wrong type.
    Logging(AnyError),
    /// A property is missing or of a wrong type.
    Property(PropertyError),
    /// The pid file couldn't be written.
    Pid(AnyError),
}

impl StartupError {
    /// Is this just the help being shown?
    pub fn is_help(&self) -> bool {
        matches!(self, StartupError::Usage(e) if e.kind == ErrorKind::HelpDisplayed)
    }
}

impl Display for StartupError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match self {
            StartupError::Usage(e) => write!(fmt, "{}", e.message),
            StartupError::Config(e) => write!(fmt, "{}", e),
            StartupError::Logging(_) => write!(fmt, "Could not configure logging"),
            StartupError::Property(e) => write!(fmt, "{}", e),
            StartupError::Pid(e) => write!(fmt, "{}", e),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StartupError::Config(e) => e.source(),
            StartupError::Logging(e) => Some(&**e),
            StartupError::Pid(e) => e.source(),
            StartupError::Usage(_) | StartupError::Property(_) => None,
        }
    }
}

impl From<PropertyError> for StartupError {
    fn from(e: PropertyError) -> Self {
        StartupError::Property(e)
    }
}

/// The bootstrapper of a node.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::PathBuf;
///
/// use nodebin::prelude::*;
///
/// struct Idle;
///
/// impl Node for Idle {
///     fn new(_: Options) -> Result<Self, AnyError> {
///         Ok(Idle)
///     }
///     fn shutdown(&mut self) {}
/// }
///
/// struct IdleFactory;
///
/// impl NodeFactory for IdleFactory {
///     type Node = Idle;
///     fn default_config_file(&self) -> PathBuf {
///         "/etc/idle.yml".into()
///     }
/// }
///
/// fn main() {
///     NodeBin::new(IdleFactory).run();
/// }
/// ```
pub struct NodeBin<F> {
    factory: F,
}

impl<F: NodeFactory> NodeBin<F> {
    /// Creates the bootstrapper.
    pub fn new(factory: F) -> Self {
        NodeBin { factory }
    }

    /// Access to the node factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Goes through the startup sequence with the process' command line.
    pub fn build(&self) -> Result<App<F::Node>, StartupError> {
        self.build_from(env::args_os())
    }

    /// Goes through the startup sequence with the given command line.
    ///
    /// The first argument is the program name.
    pub fn build_from<I, T>(&self, args: I) -> Result<App<F::Node>, StartupError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let loader = cfg_loader::parse_args(
            &self.factory.name(),
            self.factory.default_config_file(),
            args,
        )
        .map_err(StartupError::Usage)?;
        let cfg = loader.load().map_err(StartupError::Config)?;

        // No logger yet to report a bad log option, so it counts as a logging failure.
        let logger = LogConfig::from_config(&cfg)
            .map_err(|e| StartupError::Logging(e.into()))?
            .create()
            .map_err(StartupError::Logging)?;
        logger.install();
        debug!("Logging configured, config file {}", loader.path().display());

        let (reactor, faults) = Reactor::new();
        let options = Options::extract(&cfg, logger.clone(), reactor)?;
        debug!("Fixed options extracted");
        let options = self.factory.additional_config(options, &cfg)?;
        debug!("Additional options added");

        let fatal = FatalHandler::new(logger);
        debug!("Fatal error handler ready");

        let pid = PidFile::from_config(&cfg)?;
        pid.write().map_err(StartupError::Pid)?;
        debug!("Pid file {} written", pid.path().display());

        debug!("Starting node with {:?}", options);
        Ok(App::new(options, fatal, faults))
    }

    /// Bootstraps and runs the node, then exits the process.
    ///
    /// Exits with 0 when the help is shown or after the node is shut down by a signal, with 1 on
    /// any failure.
    pub fn run(self) -> ! {
        match self.build() {
            Ok(app) => {
                log_panics::init();
                app.run_term()
            }
            Err(StartupError::Usage(e)) => e.exit(),
            Err(StartupError::Property(e)) => fatal_exit(e.into()),
            Err(StartupError::Pid(e)) => fatal_exit(e),
            Err(e) => {
                eprintln!("{}", e.display(": "));
                process::exit(1);
            }
        }
    }
}

fn fatal_exit(e: AnyError) -> ! {
    error::log_fatal(log::logger(), &e);
    process::exit(1);
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::node::Node;
    use crate::value::RawConfig;

    struct Idle;

    impl Node for Idle {
        fn new(_: Options) -> Result<Self, AnyError> {
            Ok(Idle)
        }
        fn shutdown(&mut self) {}
    }

    struct Factory(PathBuf);

    impl NodeFactory for Factory {
        type Node = Idle;
        fn default_config_file(&self) -> PathBuf {
            self.0.clone()
        }
        fn additional_config(
            &self,
            options: Options,
            cfg: &RawConfig,
        ) -> Result<Options, PropertyError> {
            let extra: Option<i64> = cfg.optional("extra")?;
            Ok(options.with("extra", extra.unwrap_or(7)))
        }
    }

    fn config(dir: &tempfile::TempDir, content: &str) -> NodeBin<Factory> {
        let path = dir.path().join("node.yml");
        fs::write(&path, content).unwrap();
        NodeBin::new(Factory(path))
    }

    fn valid(dir: &tempfile::TempDir) -> String {
        format!(
            "base_dir: /srv\nnode_id: n1\nmbus: bus\nlocal_db: db\nlog_level: LOUD\n\
             pid: {}\n",
            dir.path().join("run").join("node.pid").display()
        )
    }

    #[test]
    fn help_before_config() {
        let bin = NodeBin::new(Factory("/does/not/exist.yml".into()));
        let err = bin.build_from(vec!["node", "--help"]).err().unwrap();
        assert!(err.is_help());
        let err = bin.build_from(vec!["node", "--bad"]).err().unwrap();
        assert!(!err.is_help());
    }

    #[test]
    fn missing_config() {
        let bin = NodeBin::new(Factory("/does/not/exist.yml".into()));
        match bin.build_from(vec!["node"]).err().unwrap() {
            StartupError::Config(e) => assert_eq!(Path::new("/does/not/exist.yml"), e.path()),
            other => panic!("Unexpected error {:?}", other),
        }
    }

    #[test]
    fn full_startup() {
        let dir = tempfile::tempdir().unwrap();
        let bin = config(&dir, &valid(&dir));
        let app = bin.build_from(vec!["node"]).unwrap();
        assert_eq!("n1", app.options().node_id());
        assert_eq!(Some(&7), app.options().get::<i64>("extra"));
        let pid = fs::read_to_string(dir.path().join("run").join("node.pid")).unwrap();
        assert_eq!(format!("{}\n", process::id()), pid);
    }

    #[test]
    fn config_override() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.yml");
        fs::write(&other, valid(&dir) + "extra: 3\n").unwrap();
        let bin = NodeBin::new(Factory("/does/not/exist.yml".into()));
        let app = bin
            .build_from(vec![OsString::from("node"), "-c".into(), other.into()])
            .unwrap();
        assert_eq!(Some(&3), app.options().get::<i64>("extra"));
    }

    #[test]
    fn missing_property_means_no_pid() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = valid(&dir).replace("node_id: n1\n", "");
        let bin = config(&dir, &cfg);
        match bin.build_from(vec!["node"]).err().unwrap() {
            StartupError::Property(PropertyError::MissingRequiredProperty(key)) => {
                assert_eq!("node_id", key)
            }
            other => panic!("Unexpected error {:?}", other),
        }
        assert!(!dir.path().join("run").exists());
    }

    #[test]
    fn extension_errors() {
        let dir = tempfile::tempdir().unwrap();
        let bin = config(&dir, &(valid(&dir) + "extra: \"3\"\n"));
        match bin.build_from(vec!["node"]).err().unwrap() {
            StartupError::Property(PropertyError::InvalidPropertyType { key, .. }) => {
                assert_eq!("extra", key)
            }
            other => panic!("Unexpected error {:?}", other),
        }
        assert!(!dir.path().join("run").exists());
    }

    #[test]
    fn bad_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = valid(&dir) + "log_file: /does/not/exist/node.log\n";
        let bin = config(&dir, &cfg);
        match bin.build_from(vec!["node"]).err().unwrap() {
            e @ StartupError::Logging(_) => {
                assert!(e.display(": ").to_string().contains("Failed to open log file"))
            }
            other => panic!("Unexpected error {:?}", other),
        }
    }

    #[test]
    fn bad_log_level_type() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = valid(&dir).replace("log_level: LOUD\n", "log_level: 5\n");
        let bin = config(&dir, &cfg);
        match bin.build_from(vec!["node"]).err().unwrap() {
            e @ StartupError::Logging(_) => {
                let msg = e.display(": ").to_string();
                assert!(msg.starts_with("Could not configure logging"));
                assert!(msg.contains("log_level"));
            }
            other => panic!("Unexpected error {:?}", other),
        }
        assert!(!dir.path().join("run").exists());
    }
}
