//! The validated startup record handed to the node.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::logging::Logger;
use crate::runtime::Reactor;
use crate::validation::PropertyError;
use crate::value::RawConfig;

/// Typed startup parameters of the node.
///
/// The fixed fields are read from the configuration file by the bootstrap and can only be read
/// afterwards. The [`NodeFactory`][crate::NodeFactory] may add further entries of any type,
/// keyed by name, in its [`additional_config`][crate::NodeFactory::additional_config] hook.
pub struct Options {
    logger: Logger,
    reactor: Reactor,
    index: Option<i64>,
    base_dir: String,
    ip_route: Option<String>,
    node_id: String,
    mbus: String,
    local_db: String,
    migration_nfs: Option<String>,
    additional: BTreeMap<String, Box<dyn Any + Send>>,
}

impl Options {
    /// Extracts the fixed fields.
    ///
    /// Stops at the first missing or mistyped property.
    pub(crate) fn extract(
        cfg: &RawConfig,
        logger: Logger,
        reactor: Reactor,
    ) -> Result<Self, PropertyError> {
        Ok(Options {
            logger,
            reactor,
            index: cfg.optional("index")?,
            base_dir: cfg.required("base_dir")?,
            ip_route: cfg.optional("ip_route")?,
            node_id: cfg.required("node_id")?,
            mbus: cfg.required("mbus")?,
            local_db: cfg.required("local_db")?,
            migration_nfs: cfg.optional("migration_nfs")?,
            additional: BTreeMap::new(),
        })
    }

    /// The configured logger.
    ///
    /// It is also installed as the process-wide logger, so the [`log`] macros work too.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The handle to the event loop.
    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    /// The `index` option.
    pub fn index(&self) -> Option<i64> {
        self.index
    }

    /// The `base_dir` option.
    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// The `ip_route` option.
    pub fn ip_route(&self) -> Option<&str> {
        self.ip_route.as_deref()
    }

    /// The `node_id` option.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// The `mbus` option, the message bus address.
    pub fn mbus(&self) -> &str {
        &self.mbus
    }

    /// The `local_db` option, path to the local database.
    pub fn local_db(&self) -> &str {
        &self.local_db
    }

    /// The `migration_nfs` option.
    pub fn migration_nfs(&self) -> Option<&str> {
        self.migration_nfs.as_deref()
    }

    /// Sets an additional entry, replacing any previous one under the same key.
    pub fn insert<K, T>(&mut self, key: K, value: T)
    where
        K: Into<String>,
        T: Any + Send,
    {
        self.additional.insert(key.into(), Box::new(value));
    }

    /// Builder-style version of [`insert`][Options::insert].
    pub fn with<K, T>(mut self, key: K, value: T) -> Self
    where
        K: Into<String>,
        T: Any + Send,
    {
        self.insert(key, value);
        self
    }

    /// Looks up an additional entry.
    ///
    /// Returns `None` if there's no such entry or if it is of a different type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.additional.get(key)?.downcast_ref()
    }

    /// Takes an additional entry out.
    ///
    /// If the entry is of a different type, it is left in place and `None` is returned.
    pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.additional.get(key)?.is::<T>() {
            return None;
        }
        let value = self.additional.remove(key)?;
        value.downcast().ok().map(|value| *value)
    }

    /// Is there an additional entry of this name (of any type)?
    pub fn contains(&self, key: &str) -> bool {
        self.additional.contains_key(key)
    }

    /// Names of the additional entries, in sorted order.
    pub fn additional_keys(&self) -> impl Iterator<Item = &str> {
        self.additional.keys().map(String::as_str)
    }
}

impl Debug for Options {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        fmt.debug_struct("Options")
            .field("severity", &self.logger.severity())
            .field("index", &self.index)
            .field("base_dir", &self.base_dir)
            .field("ip_route", &self.ip_route)
            .field("node_id", &self.node_id)
            .field("mbus", &self.mbus)
            .field("local_db", &self.local_db)
            .field("migration_nfs", &self.migration_nfs)
            .field("additional", &self.additional_keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;

    use super::*;
    use crate::logging::{LogConfig, LogDestination, Severity};
    use crate::value::{Kind, Value};

    fn full() -> BTreeMap<String, Value> {
        btreemap! {
            "index".to_owned() => Value::Integer(2),
            "base_dir".to_owned() => Value::from("/srv/node"),
            "ip_route".to_owned() => Value::from("10.0.0.1"),
            "node_id".to_owned() => Value::from("n1"),
            "mbus".to_owned() => Value::from("tcp://bus:4000"),
            "local_db".to_owned() => Value::from("/srv/node/db"),
            "migration_nfs".to_owned() => Value::from("/mnt/nfs"),
            "pid".to_owned() => Value::from("/run/node.pid"),
        }
    }

    fn extract(cfg: BTreeMap<String, Value>) -> Result<Options, PropertyError> {
        let logger = LogConfig {
            destination: LogDestination::StdOut,
            severity: Severity::Unknown,
        }
        .create()
        .unwrap();
        let (reactor, _) = Reactor::new();
        Options::extract(&RawConfig::from(cfg), logger, reactor)
    }

    #[test]
    fn all_fields() {
        let options = extract(full()).unwrap();
        assert_eq!(Some(2), options.index());
        assert_eq!("/srv/node", options.base_dir());
        assert_eq!(Some("10.0.0.1"), options.ip_route());
        assert_eq!("n1", options.node_id());
        assert_eq!("tcp://bus:4000", options.mbus());
        assert_eq!("/srv/node/db", options.local_db());
        assert_eq!(Some("/mnt/nfs"), options.migration_nfs());
        assert_eq!(0, options.additional_keys().count());
    }

    #[test]
    fn optional_fields() {
        let mut cfg = full();
        cfg.remove("index");
        cfg.remove("ip_route");
        cfg.insert("migration_nfs".to_owned(), Value::Null);
        let options = extract(cfg).unwrap();
        assert_eq!(None, options.index());
        assert_eq!(None, options.ip_route());
        assert_eq!(None, options.migration_nfs());
    }

    #[test]
    fn each_required_field() {
        for key in &["base_dir", "node_id", "mbus", "local_db"] {
            let mut cfg = full();
            cfg.remove(*key);
            assert_eq!(
                PropertyError::MissingRequiredProperty((*key).to_owned()),
                extract(cfg).unwrap_err()
            );
        }
    }

    #[test]
    fn wrong_type() {
        let mut cfg = full();
        cfg.insert("index".to_owned(), Value::from("1"));
        assert_eq!(
            PropertyError::InvalidPropertyType {
                key: "index".to_owned(),
                expected: Kind::Integer,
                actual: Value::from("1"),
            },
            extract(cfg).unwrap_err()
        );
    }

    #[test]
    fn additional() {
        let mut options = extract(full()).unwrap().with("heartbeat", 500i64);
        options.insert("name", "x".to_owned());
        assert_eq!(Some(&500), options.get::<i64>("heartbeat"));
        assert_eq!(None, options.get::<String>("heartbeat"));
        assert!(options.contains("name"));
        assert!(!options.contains("missing"));

        options.insert("heartbeat", 1000i64);
        assert_eq!(Some(&1000), options.get::<i64>("heartbeat"));

        assert_eq!(None, options.take::<i64>("name"));
        assert_eq!(Some("x".to_owned()), options.take::<String>("name"));
        assert_eq!(vec!["heartbeat"], options.additional_keys().collect::<Vec<_>>());

        let debug = format!("{:?}", options);
        assert!(debug.contains("node_id: \"n1\""));
        assert!(debug.contains("additional: [\"heartbeat\"]"));
    }
}
