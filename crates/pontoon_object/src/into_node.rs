//! Conversions from Rust values into [`Node`].

use crate::decimal::Decimal;
use crate::key::Key;
use crate::node::{ListRef, MapRef, Node};
use crate::object::{Json, Object};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;
use std::sync::Arc;

/// Converts a value into a [`Node`].
///
/// Endpoint functions may return any `IntoNode` type (or a `Result` of one).
pub trait IntoNode {
    /// Performs the conversion.
    fn into_node(self) -> Node;
}

impl IntoNode for Node {
    fn into_node(self) -> Node {
        self
    }
}

impl IntoNode for () {
    fn into_node(self) -> Node {
        Node::Null
    }
}

impl IntoNode for bool {
    fn into_node(self) -> Node {
        Node::Bool(self)
    }
}

macro_rules! impl_into_node_int {
    ($($ty:ty),*) => {
        $(
            impl IntoNode for $ty {
                fn into_node(self) -> Node {
                    Node::Int(i64::from(self))
                }
            }
        )*
    };
}

impl_into_node_int!(i8, i16, i32, i64, u8, u16, u32);

impl IntoNode for isize {
    fn into_node(self) -> Node {
        Node::Int(self as i64)
    }
}

impl IntoNode for u64 {
    fn into_node(self) -> Node {
        i64::try_from(self).map_or(Node::UInt(self), Node::Int)
    }
}

impl IntoNode for usize {
    fn into_node(self) -> Node {
        (self as u64).into_node()
    }
}

impl IntoNode for f32 {
    fn into_node(self) -> Node {
        Node::Float(f64::from(self))
    }
}

impl IntoNode for f64 {
    fn into_node(self) -> Node {
        Node::Float(self)
    }
}

impl IntoNode for String {
    fn into_node(self) -> Node {
        Node::Str(self)
    }
}

impl IntoNode for &str {
    fn into_node(self) -> Node {
        Node::Str(self.to_string())
    }
}

impl IntoNode for &String {
    fn into_node(self) -> Node {
        Node::Str(self.clone())
    }
}

impl IntoNode for NaiveDate {
    fn into_node(self) -> Node {
        Node::Date(self)
    }
}

impl IntoNode for NaiveTime {
    fn into_node(self) -> Node {
        Node::Time(self)
    }
}

impl IntoNode for NaiveDateTime {
    fn into_node(self) -> Node {
        Node::DateTime(self)
    }
}

impl IntoNode for DateTime<FixedOffset> {
    fn into_node(self) -> Node {
        Node::DateTimeTz(self)
    }
}

impl IntoNode for DateTime<Utc> {
    fn into_node(self) -> Node {
        Node::DateTimeTz(self.fixed_offset())
    }
}

impl IntoNode for Decimal {
    fn into_node(self) -> Node {
        Node::Decimal(self)
    }
}

impl IntoNode for Key {
    fn into_node(self) -> Node {
        match self {
            Key::Null => Node::Null,
            Key::Bool(b) => Node::Bool(b),
            Key::Int(i) => Node::Int(i),
            Key::Str(s) => Node::Str(s),
        }
    }
}

impl IntoNode for MapRef {
    fn into_node(self) -> Node {
        Node::Map(self)
    }
}

impl IntoNode for ListRef {
    fn into_node(self) -> Node {
        Node::List(self)
    }
}

impl IntoNode for Value {
    fn into_node(self) -> Node {
        Node::from(self)
    }
}

impl<T: Object> IntoNode for Arc<T> {
    fn into_node(self) -> Node {
        Node::Object(self)
    }
}

impl<T> IntoNode for Json<T>
where
    T: Serialize + Send + Sync + 'static,
{
    fn into_node(self) -> Node {
        Node::object(self)
    }
}

impl<T: IntoNode> IntoNode for Option<T> {
    fn into_node(self) -> Node {
        self.map_or(Node::Null, IntoNode::into_node)
    }
}

impl<T: IntoNode> IntoNode for Vec<T> {
    fn into_node(self) -> Node {
        Node::list(self)
    }
}

impl<K: Into<Key>, V: IntoNode, S: BuildHasher> IntoNode for HashMap<K, V, S> {
    fn into_node(self) -> Node {
        Node::map(self)
    }
}

impl<K: Into<Key>, V: IntoNode> IntoNode for BTreeMap<K, V> {
    fn into_node(self) -> Node {
        Node::map(self)
    }
}

impl<K: Into<Key>, V: IntoNode, S: BuildHasher> IntoNode for IndexMap<K, V, S> {
    fn into_node(self) -> Node {
        Node::map(self)
    }
}

impl<K: Into<Key>, S: BuildHasher> IntoNode for HashSet<K, S> {
    fn into_node(self) -> Node {
        Node::set(self)
    }
}

impl<K: Into<Key>> IntoNode for BTreeSet<K> {
    fn into_node(self) -> Node {
        Node::set(self)
    }
}

impl<K: Into<Key>, S: BuildHasher> IntoNode for IndexSet<K, S> {
    fn into_node(self) -> Node {
        Node::set(self)
    }
}

macro_rules! impl_into_node_tuple {
    ($($name:ident),+) => {
        impl<$($name: IntoNode),+> IntoNode for ($($name,)+) {
            #[expect(non_snake_case, reason = "tuple fields are bound by their type names")]
            fn into_node(self) -> Node {
                let ($($name,)+) = self;
                Node::Tuple(Arc::from([$($name.into_node()),+]))
            }
        }
    };
}

impl_into_node_tuple!(A, B);
impl_into_node_tuple!(A, B, C);
impl_into_node_tuple!(A, B, C, D);

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    n.as_f64().map_or(Self::Null, Self::Float)
                }
            }
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::list(items),
            Value::Object(entries) => Self::map(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_unsigned_values_keep_their_magnitude() {
        assert!(matches!(7u64.into_node(), Node::Int(7)));
        assert!(matches!(u64::MAX.into_node(), Node::UInt(u64::MAX)));
    }

    #[test]
    fn option_none_is_null() {
        assert!(None::<i32>.into_node().is_null());
        assert!(matches!(Some("x").into_node(), Node::Str(_)));
    }

    #[test]
    fn json_value_becomes_containers() {
        let node = Node::from(serde_json::json!({"a": [1, 2.5, null]}));
        let map = node.as_map().unwrap();
        let inner = map.get(&Key::from("a")).unwrap();
        let items = inner.as_list().unwrap().items();
        assert!(matches!(items[0], Node::Int(1)));
        assert!(matches!(items[1], Node::Float(x) if x == 2.5));
        assert!(items[2].is_null());
    }

    #[test]
    fn tuples_keep_arity() {
        let node = (1, "two", 3.0).into_node();
        assert!(matches!(node, Node::Tuple(ref items) if items.len() == 3));
    }

    #[test]
    fn utc_timestamps_gain_a_zero_offset() {
        let ts = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        assert!(matches!(ts.into_node(), Node::DateTimeTz(dt) if dt.offset().local_minus_utc() == 0));
    }
}
