//! The parsed, untyped form of the configuration file.
//!
//! The configuration file is YAML. It is parsed into a tree of [`Value`]s with [`RawConfig`] as
//! the top-level mapping. Nothing is interpreted at this stage, the typed extraction happens in
//! the [`validation`][crate::validation] module.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde_yaml::Value as Yaml;

/// One value from the configuration file.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An explicit `null` (or `~`, or a key without a value).
    Null,
    /// A boolean.
    Bool(bool),
    /// A whole number that fits into `i64`.
    ///
    /// Larger whole numbers (`18446744073709551615`, for example) don't fit and are parsed as
    /// [`Float`][Value::Float] instead, so asking for an integer property holding one of them is
    /// an [`InvalidPropertyType`][crate::validation::PropertyError::InvalidPropertyType] error.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// A string scalar.
    String(String),
    /// A list of values.
    Sequence(Vec<Value>),
    /// A nested mapping.
    Mapping(BTreeMap<String, Value>),
}

/// The type of a configuration value.
///
/// Used both to describe what a value is and what a caller expects it to be. The [`Range`] is
/// never produced by parsing, it is only ever expected (and is then read from a [`Mapping`] with
/// `first` and `last` integers).
///
/// [`Range`]: Kind::Range
/// [`Mapping`]: Kind::Mapping
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
    /// See [`Value::Null`].
    Null,
    /// See [`Value::Bool`].
    Bool,
    /// See [`Value::Integer`].
    Integer,
    /// See [`Value::Float`].
    Float,
    /// See [`Value::String`].
    String,
    /// See [`Value::Sequence`].
    Sequence,
    /// See [`Value::Mapping`].
    Mapping,
    /// An inclusive integer range.
    Range,
}

impl Display for Kind {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        let name = match self {
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Integer => "Integer",
            Kind::Float => "Float",
            Kind::String => "String",
            Kind::Sequence => "Sequence",
            Kind::Mapping => "Mapping",
            Kind::Range => "Range",
        };
        fmt.write_str(name)
    }
}

impl Value {
    /// What type of value this is.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Sequence(_) => Kind::Sequence,
            Value::Mapping(_) => Kind::Mapping,
        }
    }

    /// Looks up a key, if this is a mapping.
    ///
    /// A key holding `null` is considered absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(key).filter(|v| **v != Value::Null),
            _ => None,
        }
    }

    fn from_yaml(yaml: Yaml) -> Result<Self, ShapeError> {
        let value = match yaml {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Yaml::String(s) => Value::String(s),
            Yaml::Sequence(seq) => Value::Sequence(
                seq.into_iter()
                    .map(Value::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            Yaml::Mapping(map) => Value::Mapping(mapping_from_yaml(map)?),
        };
        Ok(value)
    }
}

fn key_from_yaml(key: Yaml) -> Result<String, ShapeError> {
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        other => Err(ShapeError::InvalidKey(format!("{:?}", other))),
    }
}

fn mapping_from_yaml(map: serde_yaml::Mapping) -> Result<BTreeMap<String, Value>, ShapeError> {
    map.into_iter()
        .map(|(k, v)| Ok((key_from_yaml(k)?, Value::from_yaml(v)?)))
        .collect()
}

// Rendered in a flow style, close enough to YAML for error messages.
impl Display for Value {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match self {
            Value::Null => write!(fmt, "null"),
            Value::Bool(b) => write!(fmt, "{}", b),
            Value::Integer(i) => write!(fmt, "{}", i),
            Value::Float(f) => write!(fmt, "{}", f),
            Value::String(s) => write!(fmt, "{:?}", s),
            Value::Sequence(seq) => {
                write!(fmt, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "{}", v)?;
                }
                write!(fmt, "]")
            }
            Value::Mapping(map) => {
                write!(fmt, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "{}: {}", k, v)?;
                }
                write!(fmt, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// The parsed document doesn't have the shape of a configuration file.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ShapeError {
    /// The document root is something else than a mapping.
    RootNotMapping(Kind),
    /// A mapping key is a sequence, mapping or null.
    InvalidKey(String),
}

impl Display for ShapeError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match self {
            ShapeError::RootNotMapping(kind) => {
                write!(fmt, "Expected a mapping at the top level, found {}", kind)
            }
            ShapeError::InvalidKey(key) => write!(fmt, "Mapping key {} is not a scalar", key),
        }
    }
}

impl Error for ShapeError {}

/// The whole configuration file.
///
/// This is the top-level mapping, keyed by option names. It is read once at startup and not
/// modified afterwards. Use the [`extract`][RawConfig::extract] family of methods to get typed
/// values out of it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawConfig(BTreeMap<String, Value>);

impl RawConfig {
    /// Converts a parsed YAML document.
    pub fn from_yaml(yaml: Yaml) -> Result<Self, ShapeError> {
        match Value::from_yaml(yaml)? {
            Value::Mapping(map) => Ok(RawConfig(map)),
            other => Err(ShapeError::RootNotMapping(other.kind())),
        }
    }

    /// Looks up a top-level key.
    ///
    /// A key holding `null` is considered absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| **v != Value::Null)
    }

    /// Iterates through the top-level keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Value>> for RawConfig {
    fn from(map: BTreeMap<String, Value>) -> Self {
        RawConfig(map)
    }
}
