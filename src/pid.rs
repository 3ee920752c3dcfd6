//! The pid file.
//!
//! The `pid` option is required. On startup, the process id is written there as decimal number
//! followed by a newline. Missing parent directories are created first.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::{self, OpenOptions};
use std::io::{Error as IoError, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use log::debug;
use nix::unistd;

use crate::error::AnyError;
use crate::validation::PropertyError;
use crate::value::RawConfig;

/// Creating the directory for the pid file failed.
#[derive(Debug)]
pub struct PidDirectoryError {
    dir: PathBuf,
    source: IoError,
}

impl Display for PidDirectoryError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(fmt, "Failed to create pid directory {}", self.dir.display())
    }
}

impl Error for PidDirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Writing the pid file failed.
#[derive(Debug)]
pub struct PidFileError {
    file: PathBuf,
    source: IoError,
}

impl Display for PidFileError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(fmt, "Failed to write pid file {}", self.file.display())
    }
}

impl Error for PidFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Where to store the process id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// A pid file at the given path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        PidFile { path: path.into() }
    }

    /// Reads the required `pid` option.
    pub fn from_config(cfg: &RawConfig) -> Result<Self, PropertyError> {
        cfg.required::<String>("pid").map(PidFile::new)
    }

    /// The path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current process id into the file.
    ///
    /// The file is truncated if it exists.
    pub fn write(&self) -> Result<(), AnyError> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| PidDirectoryError {
                dir: dir.to_owned(),
                source,
            })?;
        }
        let pid = unistd::getpid();
        debug!("Storing pid {} to {}", pid, self.path.display());
        let wrap = |source| PidFileError {
            file: self.path.clone(),
            source,
        };
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(&self.path)
            .map_err(wrap)?;
        writeln!(f, "{}", pid).map_err(wrap)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;

    use super::*;
    use crate::value::Value;

    #[test]
    fn writes_pid() {
        let dir = tempfile::tempdir().unwrap();
        let pid = PidFile::new(dir.path().join("node.pid"));
        pid.write().unwrap();
        let content = fs::read_to_string(pid.path()).unwrap();
        assert_eq!(format!("{}\n", std::process::id()), content);
    }

    #[test]
    fn creates_directories_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("node.pid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "some much longer garbage that is there from before\n").unwrap();
        let pid = PidFile::new(&path);
        pid.write().unwrap();
        assert_eq!(
            format!("{}\n", std::process::id()),
            fs::read_to_string(&path).unwrap()
        );

        let nested = PidFile::new(dir.path().join("x").join("y").join("node.pid"));
        nested.write().unwrap();
        assert!(nested.path().is_file());
    }

    #[test]
    fn directory_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let err = PidFile::new(blocker.join("node.pid")).write().unwrap_err();
        assert!(err.to_string().starts_with("Failed to"));
        assert!(err.source().is_some());
    }

    #[test]
    fn required_option() {
        let cfg = RawConfig::from(btreemap! {
            "pid".to_owned() => Value::from("/run/node.pid"),
        });
        assert_eq!(
            PidFile::new("/run/node.pid"),
            PidFile::from_config(&cfg).unwrap()
        );
        assert_eq!(
            PropertyError::MissingRequiredProperty("pid".to_owned()),
            PidFile::from_config(&RawConfig::default()).unwrap_err()
        );
    }
}
