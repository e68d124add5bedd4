//! Cycle-safe conversion of a [`Node`] graph into JSON.
//!
//! Every call to [`serialize`] starts with its own empty visiting set, so
//! concurrent serializations never share state. A container or object that
//! reappears while it is still on the recursion stack is replaced by
//! [`CIRCULAR_MARKER`]; the same value reached again through a sibling path
//! is serialized normally.

use crate::key::Key;
use crate::node::{Node, identity_of};
use crate::object::{Object, short_type_name};
use chrono::SecondsFormat;
use hashbrown::HashSet;
use serde_json::{Map, Value};

/// Emitted in place of a value that is already being serialized higher up
/// the same path.
pub const CIRCULAR_MARKER: &str = "<circular_reference>";

/// Serializes a node graph with a fresh visiting set.
#[must_use]
pub fn serialize(node: &Node) -> Value {
    Serializer::new().serialize(node)
}

/// Serializes a node graph straight to a JSON string.
///
/// Never fails: if encoding the serialized tree fails, a JSON document
/// describing the failure is returned instead.
#[must_use]
pub fn to_json_string(node: &Node) -> String {
    let value = serialize(node);
    match serde_json::to_string(&value) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, kind = node.kind(), "JSON encoding failed");
            serde_json::json!({
                "error": "Serialization failed",
                "message": err.to_string(),
                "type": node.kind(),
            })
            .to_string()
        }
    }
}

/// A single serialization pass.
///
/// Holds the identities of the containers and objects on the current
/// recursion path.
#[derive(Debug, Default)]
pub struct Serializer {
    visiting: HashSet<usize>,
}

impl Serializer {
    /// Creates a serializer with an empty visiting set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of values currently on the recursion path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.visiting.len()
    }

    /// Converts `node` into a JSON-safe value.
    pub fn serialize(&mut self, node: &Node) -> Value {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Int(i) => Value::from(*i),
            Node::UInt(u) => Value::from(*u),
            Node::Float(x) => float(*x),
            Node::Str(s) => Value::String(s.clone()),
            Node::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Node::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
            Node::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Node::DateTimeTz(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            Node::Decimal(d) => float(d.to_f64()),
            Node::Map(map) => self.enter(map.identity(), |this| {
                let mut out = Map::new();
                for (key, value) in map.entries() {
                    let value = this.serialize(&value);
                    out.insert(key.render(), value);
                }
                Value::Object(out)
            }),
            Node::List(list) => self.enter(list.identity(), |this| {
                Value::Array(list.items().iter().map(|item| this.serialize(item)).collect())
            }),
            Node::Tuple(items) => self.enter(identity_of(items), |this| {
                Value::Array(items.iter().map(|item| this.serialize(item)).collect())
            }),
            Node::Set(members) => Value::Array(members.iter().map(Key::to_value).collect()),
            Node::Object(object) => {
                self.enter(identity_of(object), |this| this.serialize_object(object.as_ref()))
            }
        }
    }

    fn enter(&mut self, id: usize, f: impl FnOnce(&mut Self) -> Value) -> Value {
        if !self.visiting.insert(id) {
            return Value::String(CIRCULAR_MARKER.to_string());
        }
        let value = f(self);
        self.visiting.remove(&id);
        value
    }

    fn serialize_object(&mut self, object: &dyn Object) -> Value {
        let type_name = short_type_name(object.type_name());

        match object.dump() {
            Some(Ok(dumped)) => return self.serialize(&dumped),
            Some(Err(err)) => {
                tracing::debug!(type_name, error = %err, "dump failed, trying next capability");
            }
            None => {}
        }

        if let Some(table) = object.table() {
            let mut out = Map::new();
            for column in &table.columns {
                let value = match object.column(column) {
                    Ok(node) => self.serialize(&node),
                    Err(err) => {
                        tracing::debug!(type_name, column = %column, error = %err, "column unreadable");
                        Value::Null
                    }
                };
                out.insert(column.clone(), value);
            }
            for (name, value) in object.attributes() {
                if name.starts_with('_') || out.contains_key(&name) {
                    continue;
                }
                match value {
                    Ok(node) => {
                        let value = self.serialize(&node);
                        out.insert(name, value);
                    }
                    Err(err) => {
                        tracing::debug!(type_name, attribute = %name, error = %err, "skipping attribute");
                    }
                }
            }
            return Value::Object(out);
        }

        if let Some(fields) = object.fields() {
            let mut out = Map::new();
            for (name, node) in fields {
                let value = self.serialize(&node);
                out.insert(name, value);
            }
            return Value::Object(out);
        }

        match object.to_json() {
            Some(Ok(value)) => return value,
            Some(Err(err)) => {
                tracing::debug!(type_name, error = %err, "JSON conversion failed");
            }
            None => {}
        }

        if let Some(text) = object.describe() {
            return Value::String(text);
        }

        Value::String(format!("<{type_name}>"))
    }
}

fn float(x: f64) -> Value {
    serde_json::Number::from_f64(x).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decimal, Json, ListRef, MapRef, ObjectError, TableInfo};
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn primitives_pass_through() {
        assert_eq!(serialize(&Node::Null), Value::Null);
        assert_eq!(serialize(&Node::Bool(true)), json!(true));
        assert_eq!(serialize(&Node::Int(-3)), json!(-3));
        assert_eq!(serialize(&Node::UInt(u64::MAX)), json!(u64::MAX));
        assert_eq!(serialize(&Node::Float(1.5)), json!(1.5));
        assert_eq!(serialize(&Node::Str("hi".into())), json!("hi"));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(serialize(&Node::Float(f64::NAN)), Value::Null);
        assert_eq!(serialize(&Node::Float(f64::INFINITY)), Value::Null);
    }

    #[test]
    fn dates_use_iso_8601() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let time = NaiveTime::from_hms_opt(7, 5, 0).unwrap();
        let stamp = date.and_time(time);
        let aware = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap().fixed_offset();

        assert_eq!(serialize(&Node::Date(date)), json!("2024-03-09"));
        assert_eq!(serialize(&Node::Time(time)), json!("07:05:00"));
        assert_eq!(serialize(&Node::DateTime(stamp)), json!("2024-03-09T07:05:00"));
        assert_eq!(serialize(&Node::DateTimeTz(aware)), json!("2024-03-09T07:05:00+00:00"));
    }

    #[test]
    fn decimals_become_floats() {
        let decimal: Decimal = "19.99".parse().unwrap();
        assert_eq!(serialize(&Node::Decimal(decimal)), json!(19.99));
    }

    #[test]
    fn map_keys_are_coerced_to_strings() {
        let map = MapRef::new();
        map.insert(Key::Int(1), "one");
        map.insert(Key::Bool(false), "no");
        map.insert(Key::Null, "none");

        assert_eq!(
            serialize(&Node::Map(map)),
            json!({"1": "one", "false": "no", "null": "none"})
        );
    }

    #[test]
    fn sets_and_tuples_become_arrays() {
        let set = Node::set([1i64, 2, 3]);
        let tuple = Node::tuple([Node::Int(1), Node::Str("a".into())]);
        assert_eq!(serialize(&set), json!([1, 2, 3]));
        assert_eq!(serialize(&tuple), json!([1, "a"]));
    }

    #[test]
    fn self_referential_map_is_marked() {
        let map = MapRef::new();
        map.insert("name", "root");
        map.insert("me", Node::Map(map.clone()));

        assert_eq!(
            serialize(&Node::Map(map)),
            json!({"name": "root", "me": CIRCULAR_MARKER})
        );
    }

    #[test]
    fn shared_sibling_is_not_circular() {
        let shared = ListRef::new();
        shared.push(1);
        let root = Node::map([
            ("left", Node::List(shared.clone())),
            ("right", Node::List(shared)),
        ]);

        assert_eq!(serialize(&root), json!({"left": [1], "right": [1]}));
    }

    #[test]
    fn list_containing_itself_is_marked() {
        let list = ListRef::new();
        list.push(0);
        list.push(Node::List(list.clone()));
        assert_eq!(serialize(&Node::List(list)), json!([0, CIRCULAR_MARKER]));
    }

    #[test]
    fn visiting_set_is_empty_after_each_call() {
        let map = MapRef::new();
        map.insert("me", Node::Map(map.clone()));
        let mut serializer = Serializer::new();
        let _ = serializer.serialize(&Node::Map(map));
        assert_eq!(serializer.depth(), 0);
    }

    struct Post {
        id: i64,
        title: String,
        broken: bool,
    }

    impl Object for Post {
        fn table(&self) -> Option<TableInfo> {
            Some(TableInfo::new("posts", ["id", "title"]))
        }

        fn column(&self, name: &str) -> Result<Node, ObjectError> {
            match name {
                "id" => Ok(Node::Int(self.id)),
                "title" => Ok(Node::Str(self.title.clone())),
                other => Err(ObjectError::missing_attribute(other)),
            }
        }

        fn attributes(&self) -> Vec<(String, Result<Node, ObjectError>)> {
            let mut attrs = vec![
                ("id".to_string(), Ok(Node::Int(-1))),
                ("_state".to_string(), Ok(Node::Str("internal".into()))),
                ("comments".to_string(), Ok(Node::list([1, 2]))),
            ];
            if self.broken {
                attrs.push((
                    "author".to_string(),
                    Err(ObjectError::failed("lazy load outside session")),
                ));
            }
            attrs
        }
    }

    #[test]
    fn relational_model_uses_columns_then_extra_attributes() {
        let post = Post {
            id: 7,
            title: "Hello".into(),
            broken: true,
        };

        assert_eq!(
            serialize(&Node::object(post)),
            json!({"id": 7, "title": "Hello", "comments": [1, 2]})
        );
    }

    struct Point {
        x: i64,
        y: i64,
    }

    impl Object for Point {
        fn fields(&self) -> Option<Vec<(String, Node)>> {
            Some(vec![
                ("x".to_string(), Node::Int(self.x)),
                ("y".to_string(), Node::Int(self.y)),
            ])
        }
    }

    #[test]
    fn record_like_object_becomes_mapping() {
        assert_eq!(
            serialize(&Node::object(Point { x: 1, y: -1 })),
            json!({"x": 1, "y": -1})
        );
    }

    struct FailingDump;

    impl Object for FailingDump {
        fn dump(&self) -> Option<Result<Node, ObjectError>> {
            Some(Err(ObjectError::failed("validation")))
        }

        fn describe(&self) -> Option<String> {
            Some("FailingDump(..)".to_string())
        }
    }

    #[test]
    fn failing_capability_falls_through() {
        assert_eq!(serialize(&Node::object(FailingDump)), json!("FailingDump(..)"));
    }

    struct Opaque;

    impl Object for Opaque {}

    #[test]
    fn last_resort_is_type_name() {
        assert_eq!(serialize(&Node::object(Opaque)), json!("<Opaque>"));
    }

    struct SelfDumping(std::sync::OnceLock<Arc<dyn Object>>);

    impl Object for SelfDumping {
        fn dump(&self) -> Option<Result<Node, ObjectError>> {
            let me = self.0.get()?.clone();
            Some(Ok(Node::map([("me", Node::Object(me))])))
        }
    }

    #[test]
    fn object_dumping_itself_is_marked() {
        let object: Arc<SelfDumping> = Arc::new(SelfDumping(std::sync::OnceLock::new()));
        let as_dyn: Arc<dyn Object> = object.clone();
        let _ = object.0.set(as_dyn.clone());

        assert_eq!(
            serialize(&Node::Object(as_dyn)),
            json!({"me": CIRCULAR_MARKER})
        );
    }

    #[test]
    fn json_adapter_dumps_serde_types() {
        #[derive(serde::Serialize)]
        struct Item {
            id: u32,
            tags: Vec<&'static str>,
        }

        let node = Node::object(Json(Item {
            id: 1,
            tags: vec!["a"],
        }));
        assert_eq!(serialize(&node), json!({"id": 1, "tags": ["a"]}));
    }

    #[test]
    fn json_string_dump() {
        let node = Node::map([("a", 1)]);
        assert_eq!(to_json_string(&node), r#"{"a":1}"#);
    }
}
