//! The resolved call frame.

use crate::depends::Injected;
use crate::error::BindError;
use core::fmt;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;

/// One resolved argument.
pub enum Arg {
    /// A JSON value, bound by deserialization.
    Value(Value),
    /// A typed value, bound by downcast.
    Injected(Injected),
}

impl Arg {
    /// Wraps a typed value.
    pub fn injected<T: Send + 'static>(value: T) -> Self {
        Self::Injected(Box::new(value))
    }

    /// Returns the JSON value, if this is one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Injected(_) => None,
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Injected(_) => f.write_str("Injected(..)"),
        }
    }
}

/// Parameter name to resolved argument, for one invocation.
///
/// Names the resolver could not resolve are absent.
#[derive(Debug, Default)]
pub struct CallFrame {
    args: IndexMap<String, Arg>,
}

impl CallFrame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an argument, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, arg: impl Into<Arg>) {
        self.args.insert(name.into(), arg.into());
    }

    /// Returns the argument for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.args.get(name)
    }

    /// Returns `true` if `name` was resolved.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    /// Returns the number of resolved arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` if nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Returns the resolved names in resolution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    /// Removes and binds `name` as a `T`.
    ///
    /// JSON values are deserialized; injected values must already be a `T`.
    /// An unresolved name binds as JSON `null`, so `Option<T>` parameters
    /// become `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] when the value does not fit `T`.
    pub fn take_value<T>(&mut self, name: &str) -> Result<T, BindError>
    where
        T: DeserializeOwned + 'static,
    {
        match self.args.shift_remove(name) {
            Some(Arg::Value(value)) => {
                serde_json::from_value(value).map_err(|source| BindError::Invalid {
                    param: name.to_string(),
                    source,
                })
            }
            Some(Arg::Injected(value)) => downcast(name, value),
            None => serde_json::from_value(Value::Null).map_err(|_| BindError::Missing {
                param: name.to_string(),
            }),
        }
    }

    /// Removes and binds an injected `name` as a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Missing`] if unresolved and
    /// [`BindError::TypeMismatch`] if the value is not a `T`.
    pub fn take_injected<T: 'static>(&mut self, name: &str) -> Result<T, BindError> {
        match self.args.shift_remove(name) {
            Some(Arg::Injected(value)) => downcast(name, value),
            Some(Arg::Value(_)) => Err(BindError::TypeMismatch {
                param: name.to_string(),
                expected: type_name::<T>(),
            }),
            None => Err(BindError::Missing {
                param: name.to_string(),
            }),
        }
    }
}

fn downcast<T: 'static>(name: &str, value: Injected) -> Result<T, BindError> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| BindError::TypeMismatch {
            param: name.to_string(),
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn binds_json_values() {
        let mut frame = CallFrame::new();
        frame.insert("item_id", json!(7));
        frame.insert("tags", json!(["a", "b"]));

        assert_eq!(frame.take_value::<i64>("item_id").unwrap(), 7);
        assert_eq!(frame.take_value::<Vec<String>>("tags").unwrap(), ["a", "b"]);
        assert!(frame.is_empty());
    }

    #[test]
    fn unresolved_binds_as_null() {
        let mut frame = CallFrame::new();
        assert_eq!(frame.take_value::<Option<String>>("q").unwrap(), None);

        let err = frame.take_value::<i64>("item_id").unwrap_err();
        assert!(matches!(err, BindError::Missing { ref param } if param == "item_id"));
    }

    #[test]
    fn invalid_value_reports_parameter() {
        let mut frame = CallFrame::new();
        frame.insert("item_id", json!("seven"));
        let err = frame.take_value::<i64>("item_id").unwrap_err();
        assert!(err.to_string().contains("item_id"));
        assert!(matches!(err, BindError::Invalid { .. }));
    }

    #[test]
    fn injected_values_downcast() {
        let mut frame = CallFrame::new();
        frame.insert("db", Arg::injected(String::from("pool")));
        frame.insert("limit", Arg::injected(5_u32));

        assert_eq!(frame.take_injected::<String>("db").unwrap(), "pool");
        assert_eq!(frame.take_value::<u32>("limit").unwrap(), 5);
    }

    #[test]
    fn injected_type_mismatch() {
        let mut frame = CallFrame::new();
        frame.insert("db", Arg::injected(1_u8));
        let err = frame.take_injected::<String>("db").unwrap_err();
        assert!(matches!(err, BindError::TypeMismatch { .. }));
    }

    #[test]
    fn names_follow_resolution_order() {
        let mut frame = CallFrame::new();
        frame.insert("a", json!(1));
        frame.insert("db", Arg::injected(()));
        assert_eq!(frame.names().collect::<Vec<_>>(), ["a", "db"]);
    }
}
