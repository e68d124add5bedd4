//! The dynamic value graph.

use crate::decimal::Decimal;
use crate::into_node::IntoNode;
use crate::key::Key;
use crate::object::Object;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use core::fmt;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::sync::Arc;

/// A dynamically typed value returned by a handler.
///
/// Scalars are held by value. Maps and lists are shared handles
/// ([`MapRef`], [`ListRef`]) so a graph may contain the same container more
/// than once, including inside itself. Cloning a `Node` is cheap.
#[derive(Clone, Default)]
pub enum Node {
    /// The absent value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer above `i64::MAX`.
    UInt(u64),
    /// A floating-point number; non-finite values serialize as `null`.
    Float(f64),
    /// A string.
    Str(String),
    /// A calendar date.
    Date(NaiveDate),
    /// A wall-clock time.
    Time(NaiveTime),
    /// A timestamp without an offset.
    DateTime(NaiveDateTime),
    /// A timestamp with a fixed UTC offset.
    DateTimeTz(DateTime<FixedOffset>),
    /// An exact decimal.
    Decimal(Decimal),
    /// A shared, mutable mapping.
    Map(MapRef),
    /// A shared, mutable sequence.
    List(ListRef),
    /// An immutable sequence.
    Tuple(Arc<[Node]>),
    /// An unordered collection of distinct keys.
    Set(Arc<IndexSet<Key>>),
    /// A domain object.
    Object(Arc<dyn Object>),
}

impl Node {
    /// Builds a map node from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<Key>,
        V: IntoNode,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(entries.into_iter().collect())
    }

    /// Builds a list node.
    pub fn list<V: IntoNode, I: IntoIterator<Item = V>>(items: I) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Builds a tuple node.
    pub fn tuple<V: IntoNode, I: IntoIterator<Item = V>>(items: I) -> Self {
        Self::Tuple(items.into_iter().map(IntoNode::into_node).collect())
    }

    /// Builds a set node.
    pub fn set<K: Into<Key>, I: IntoIterator<Item = K>>(members: I) -> Self {
        Self::Set(Arc::new(members.into_iter().map(Into::into).collect()))
    }

    /// Wraps a domain object.
    pub fn object(object: impl Object) -> Self {
        Self::Object(Arc::new(object))
    }

    /// Returns `true` for [`Node::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns a short name for the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) | Self::DateTimeTz(_) => "datetime",
            Self::Decimal(_) => "decimal",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Object(_) => "object",
        }
    }

    /// Returns the map handle if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the list handle if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }
}

// Containers print their identity rather than their contents so that
// self-referential graphs can be debug-printed.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Date(d) => f.debug_tuple("Date").field(d).finish(),
            Self::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Self::DateTime(dt) => f.debug_tuple("DateTime").field(dt).finish(),
            Self::DateTimeTz(dt) => f.debug_tuple("DateTimeTz").field(dt).finish(),
            Self::Decimal(d) => f.debug_tuple("Decimal").field(d).finish(),
            Self::Map(map) => map.fmt(f),
            Self::List(list) => list.fmt(f),
            Self::Tuple(items) => f.debug_tuple("Tuple").field(&items.len()).finish(),
            Self::Set(members) => f.debug_tuple("Set").field(members).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
        }
    }
}

/// Returns the address of a shared allocation, used as its identity.
pub(crate) fn identity_of<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc).cast::<()>().addr()
}

// ─────────────────────────────────────────────────────────────────────────────
// MapRef
// ─────────────────────────────────────────────────────────────────────────────

/// A shared, interior-mutable map with insertion order.
///
/// Clones share the same storage; two handles are the same map when
/// [`ptr_eq`](Self::ptr_eq) holds.
#[derive(Clone, Default)]
pub struct MapRef(Arc<RwLock<IndexMap<Key, Node>>>);

impl MapRef {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value under the key.
    pub fn insert(&self, key: impl Into<Key>, value: impl IntoNode) -> Option<Node> {
        self.0.write().insert(key.into(), value.into_node())
    }

    /// Returns a clone of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<Node> {
        self.0.read().get(key).cloned()
    }

    /// Removes a key, keeping the order of the remaining entries.
    pub fn remove(&self, key: &Key) -> Option<Node> {
        self.0.write().shift_remove(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns a snapshot of the entries.
    ///
    /// The lock is released before the snapshot is returned, so callers may
    /// walk into nested handles (including this one) freely.
    #[must_use]
    pub fn entries(&self) -> Vec<(Key, Node)> {
        self.0
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns the identity of the underlying storage.
    #[must_use]
    pub fn identity(&self) -> usize {
        identity_of(&self.0)
    }

    /// Returns `true` if both handles share storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<K: Into<Key>, V: IntoNode> FromIterator<(K, V)> for MapRef {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into_node()))
            .collect();
        Self(Arc::new(RwLock::new(entries)))
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapRef")
            .field("id", &format_args!("{:#x}", self.identity()))
            .field("len", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ListRef
// ─────────────────────────────────────────────────────────────────────────────

/// A shared, interior-mutable list.
#[derive(Clone, Default)]
pub struct ListRef(Arc<RwLock<Vec<Node>>>);

impl ListRef {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn push(&self, value: impl IntoNode) {
        self.0.write().push(value.into_node());
    }

    /// Returns a clone of the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Node> {
        self.0.read().get(index).cloned()
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns a snapshot of the elements.
    #[must_use]
    pub fn items(&self) -> Vec<Node> {
        self.0.read().clone()
    }

    /// Returns the identity of the underlying storage.
    #[must_use]
    pub fn identity(&self) -> usize {
        identity_of(&self.0)
    }

    /// Returns `true` if both handles share storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<V: IntoNode> FromIterator<V> for ListRef {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let items = iter.into_iter().map(IntoNode::into_node).collect();
        Self(Arc::new(RwLock::new(items)))
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListRef")
            .field("id", &format_args!("{:#x}", self.identity()))
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_clones_share_storage() {
        let map = MapRef::new();
        let alias = map.clone();
        alias.insert("x", 1);

        assert!(map.ptr_eq(&alias));
        assert_eq!(map.identity(), alias.identity());
        assert_eq!(map.len(), 1);
        assert!(matches!(map.get(&Key::from("x")), Some(Node::Int(1))));
    }

    #[test]
    fn distinct_maps_have_distinct_identities() {
        let a = MapRef::new();
        let b = MapRef::new();
        assert!(!a.ptr_eq(&b));
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn remove_keeps_insertion_order() {
        let map: MapRef = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        map.remove(&Key::from("b"));
        let keys: Vec<_> = map.entries().into_iter().map(|(k, _)| k.render()).collect();
        assert_eq!(keys, ["a", "c"]);
    }

    #[test]
    fn self_referential_map_debug_prints() {
        let map = MapRef::new();
        map.insert("me", Node::Map(map.clone()));
        let printed = format!("{:?}", Node::Map(map));
        assert!(printed.contains("len: 1"));
    }

    #[test]
    fn list_push_and_snapshot() {
        let list = ListRef::new();
        list.push(1);
        list.push("two");
        assert_eq!(list.len(), 2);
        assert!(matches!(list.items()[1], Node::Str(ref s) if s == "two"));
        assert_eq!(Node::List(list).kind(), "list");
    }
}
