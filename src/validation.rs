//! Typed extraction of configuration properties.
//!
//! The [`RawConfig`] holds whatever the operator wrote. Before any of it is handed to the node,
//! each property the node needs is pulled out through [`RawConfig::extract`] (or its
//! [`required`][RawConfig::required] and [`optional`][RawConfig::optional] shorthands), which
//! checks the property is present (unless optional) and of the right type.
//!
//! There's no coercion. A quoted `"42"` is a string and is refused where an integer is expected,
//! `42` is refused where a string is expected and an integer is not accepted as a float either.
//!
//! # Examples
//!
//! ```rust
//! use std::ops::RangeInclusive;
//!
//! use nodebin::cfg_loader;
//!
//! # fn main() -> Result<(), nodebin::AnyError> {
//! let cfg = cfg_loader::parse("node_id: n1\nports:\n  first: 5\n  last: 10\n")?;
//! let node_id: String = cfg.required("node_id")?;
//! let ports: RangeInclusive<i64> = cfg.required("ports")?;
//! let index: Option<i64> = cfg.optional("index")?;
//! assert_eq!("n1", node_id);
//! assert_eq!(5..=10, ports);
//! assert_eq!(None, index);
//! # Ok(())
//! # }
//! ```
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::RangeInclusive;

use crate::value::{Kind, RawConfig, Value};

/// A property is missing or has the wrong type.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum PropertyError {
    /// A property that isn't optional is not in the configuration.
    MissingRequiredProperty(String),

    /// The property is there, but of a different type than expected.
    InvalidPropertyType {
        /// The name of the property.
        key: String,
        /// The type that was asked for.
        expected: Kind,
        /// What was found instead.
        actual: Value,
    },

    /// A range was expected, but the value is not a mapping with integer `first` and `last`.
    InvalidRangeObject(Value),
}

impl Display for PropertyError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match self {
            PropertyError::MissingRequiredProperty(key) => {
                write!(fmt, "Missing required option: {}", key)
            }
            PropertyError::InvalidPropertyType {
                key,
                expected,
                actual,
            } => write!(fmt, "Invalid {} object in {}: {}", expected, key, actual),
            PropertyError::InvalidRangeObject(actual) => {
                write!(fmt, "Invalid Range object: {}", actual)
            }
        }
    }
}

impl Error for PropertyError {}

/// A type that can be extracted from a configuration [`Value`].
///
/// Implemented for the native counterparts of each [`Kind`]. The inclusive integer range is
/// special, it is read from a mapping with `first` and `last` integer keys.
pub trait Property: Sized {
    /// The kind of value this reads.
    const KIND: Kind;

    /// Converts the value, if it is of the right kind.
    fn from_value(value: &Value) -> Option<Self>;

    /// The error returned when [`from_value`][Property::from_value] refuses the value.
    fn invalid(key: &str, value: &Value) -> PropertyError {
        PropertyError::InvalidPropertyType {
            key: key.to_owned(),
            expected: Self::KIND,
            actual: value.clone(),
        }
    }
}

macro_rules! variant_property {
    ($ty: ty, $kind: ident) => {
        impl Property for $ty {
            const KIND: Kind = Kind::$kind;
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$kind(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

variant_property!(bool, Bool);
variant_property!(i64, Integer);
variant_property!(f64, Float);
variant_property!(String, String);
variant_property!(Vec<Value>, Sequence);
variant_property!(BTreeMap<String, Value>, Mapping);

// Anything goes, so the kind is never reported.
impl Property for Value {
    const KIND: Kind = Kind::Null;
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl Property for RangeInclusive<i64> {
    const KIND: Kind = Kind::Range;

    fn from_value(value: &Value) -> Option<Self> {
        match (value.get("first")?, value.get("last")?) {
            (Value::Integer(first), Value::Integer(last)) => Some(*first..=*last),
            _ => None,
        }
    }

    fn invalid(_key: &str, value: &Value) -> PropertyError {
        PropertyError::InvalidRangeObject(value.clone())
    }
}

impl RawConfig {
    /// Extracts one property.
    ///
    /// Returns `Ok(None)` if the property is not present (or is `null`) and `optional` is set.
    /// Otherwise a missing property is a [`MissingRequiredProperty`] error and a present one of
    /// the wrong type is [`InvalidPropertyType`] (or [`InvalidRangeObject`] for ranges).
    ///
    /// [`MissingRequiredProperty`]: PropertyError::MissingRequiredProperty
    /// [`InvalidPropertyType`]: PropertyError::InvalidPropertyType
    /// [`InvalidRangeObject`]: PropertyError::InvalidRangeObject
    pub fn extract<T: Property>(
        &self,
        key: &str,
        optional: bool,
    ) -> Result<Option<T>, PropertyError> {
        match self.get(key) {
            None if optional => Ok(None),
            None => Err(PropertyError::MissingRequiredProperty(key.to_owned())),
            Some(value) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| T::invalid(key, value)),
        }
    }

    /// Extracts a property that must be present.
    pub fn required<T: Property>(&self, key: &str) -> Result<T, PropertyError> {
        match self.extract(key, false)? {
            Some(value) => Ok(value),
            None => Err(PropertyError::MissingRequiredProperty(key.to_owned())),
        }
    }

    /// Extracts a property that may be missing.
    pub fn optional<T: Property>(&self, key: &str) -> Result<Option<T>, PropertyError> {
        self.extract(key, true)
    }
}
