//! Command line parsing and configuration loading.
//!
//! The node takes a single meaningful option, `-c`/`--config`, naming the YAML configuration
//! file. If it is not given, the [default path][crate::NodeFactory::default_config_file] of the
//! node is used instead. `-h`/`--help` prints the usage.
//!
//! The lifetime of loading is:
//!
//! 1. Parse the command line with [`parse_args`]. This produces a [`Loader`] with the path
//!    resolved.
//! 2. [`load`][Loader::load] the configuration into a [`RawConfig`].
//!
//! # Examples
//!
//! ```rust
//! use nodebin::cfg_loader;
//!
//! let loader = cfg_loader::parse_args("node", "/etc/node.yml", vec!["node"]).unwrap();
//! assert_eq!(std::path::Path::new("/etc/node.yml"), loader.path());
//!
//! let help = cfg_loader::parse_args("node", "/etc/node.yml", vec!["node", "--help"])
//!     .unwrap_err();
//! assert_eq!(structopt::clap::ErrorKind::HelpDisplayed, help.kind);
//! ```

use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use structopt::clap::{AppSettings, Error as ClapError};
use structopt::StructOpt;

use crate::error::AnyError;
use crate::value::RawConfig;

#[derive(Debug, StructOpt)]
#[structopt(global_settings = &[AppSettings::DisableVersion])]
struct CommonOpts {
    /// Path to the configuration file.
    #[structopt(
        short = "c",
        long = "config",
        parse(from_os_str = crate::utils::absolute_from_os_str)
    )]
    config: Option<PathBuf>,
}

/// The name the program was run under.
///
/// This is the file name of the first command line argument, or `node` if there's none.
pub fn program_name(argv0: Option<&OsString>) -> String {
    argv0
        .and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "node".to_owned())
}

/// Parses the command line.
///
/// The `name` is shown in the usage banner. The first of the `args` is the program name, as with
/// [`std::env::args_os`]. The `default` path is used when no `--config` is given.
///
/// When the user asks for help, an error of the
/// [`HelpDisplayed`][structopt::clap::ErrorKind::HelpDisplayed] kind is returned. Calling
/// [`exit`][structopt::clap::Error::exit] on it prints the usage and terminates successfully, the
/// same as with any other error except the exit code.
pub fn parse_args<D, I, T>(name: &str, default: D, args: I) -> Result<Loader, ClapError>
where
    D: Into<PathBuf>,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let usage = format!("{} [options]", name);
    let matches = CommonOpts::clap()
        .bin_name(name)
        .usage(usage.as_str())
        .get_matches_from_safe(args)?;
    let opts = CommonOpts::from_clap(&matches);
    debug!("Parsed command line arguments: {:?}", opts);
    let path = opts.config.unwrap_or_else(|| default.into());
    Ok(Loader { path })
}

/// Reading or parsing the configuration file failed.
#[derive(Debug)]
pub struct ConfigReadError {
    path: PathBuf,
    cause: AnyError,
}

impl ConfigReadError {
    /// The file that was being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Display for ConfigReadError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(fmt, "Could not read configuration file {}", self.path.display())
    }
}

impl Error for ConfigReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Loads the configuration file.
///
/// Created by [`parse_args`], or directly with [`Loader::new`] (likely useful for tests).
#[derive(Clone, Debug)]
pub struct Loader {
    path: PathBuf,
}

impl Loader {
    /// A loader of the given file, bypassing the command line.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Loader { path: path.into() }
    }

    /// The configuration file to load.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file.
    pub fn load(&self) -> Result<RawConfig, ConfigReadError> {
        debug!("Loading configuration from {}", self.path.display());
        let wrap = |cause: AnyError| ConfigReadError {
            path: self.path.clone(),
            cause,
        };
        let content = fs::read_to_string(&self.path).map_err(|e| wrap(e.into()))?;
        let cfg = parse(&content).map_err(wrap)?;
        trace!("Configuration keys: {:?}", cfg.keys().collect::<Vec<_>>());
        Ok(cfg)
    }
}

/// Parses the configuration from a YAML string.
pub fn parse(yaml: &str) -> Result<RawConfig, AnyError> {
    let doc: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    Ok(RawConfig::from_yaml(doc)?)
}
