//! Dynamic object graph and cycle-safe serializer for Pontoon.
//!
//! Handler return values reach the bridge as a [`Node`] graph: primitives,
//! calendar values, exact decimals, shared containers that may reference
//! themselves, and arbitrary domain objects behind the [`Object`] trait.
//! The [`serializer`] turns any such graph into a JSON-safe
//! [`serde_json::Value`] without ever failing.
//!
//! # Example
//!
//! ```
//! use pontoon_object::{MapRef, Node, serialize, CIRCULAR_MARKER};
//!
//! let root = MapRef::new();
//! root.insert("a", 1);
//! let inner = MapRef::new();
//! inner.insert("c", Node::Map(root.clone()));
//! root.insert("b", Node::Map(inner));
//!
//! let json = serialize(&Node::Map(root));
//! assert_eq!(json["a"], 1);
//! assert_eq!(json["b"]["c"], CIRCULAR_MARKER);
//! ```

mod decimal;
mod error;
mod into_node;
mod key;
mod node;
mod object;
pub mod serializer;

pub use decimal::Decimal;
pub use error::{DecimalError, ObjectError};
pub use into_node::IntoNode;
pub use key::Key;
pub use node::{ListRef, MapRef, Node};
pub use object::{Json, Object, TableInfo, short_type_name};
pub use serializer::{CIRCULAR_MARKER, Serializer, serialize, to_json_string};
