//! Property tests for the serializer.

use chrono::NaiveDate;
use pontoon_object::{CIRCULAR_MARKER, Decimal, Key, MapRef, Node, serialize};
use proptest::prelude::*;
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

fn decimal_strategy() -> impl Strategy<Value = Node> {
    (any::<i32>(), 0u32..6).prop_map(|(mantissa, scale)| {
        let literal = if scale == 0 {
            mantissa.to_string()
        } else {
            format!("{mantissa}e-{scale}")
        };
        literal
            .parse::<Decimal>()
            .map_or(Node::Int(i64::from(mantissa)), Node::Decimal)
    })
}

fn leaf_strategy() -> impl Strategy<Value = Node> {
    prop_oneof![
        Just(Node::Null),
        any::<bool>().prop_map(Node::Bool),
        any::<i64>().prop_map(Node::Int),
        any::<f64>().prop_map(Node::Float),
        "[a-z0-9 ]{0,12}".prop_map(Node::Str),
        (0i32..1_000_000).prop_filter_map("valid date", |days| {
            NaiveDate::from_num_days_from_ce_opt(days).map(Node::Date)
        }),
        decimal_strategy(),
    ]
}

fn node_strategy() -> impl Strategy<Value = Node> {
    leaf_strategy().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Node::list),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Node::tuple),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6).prop_map(Node::map),
            prop::collection::vec(any::<i64>(), 0..6).prop_map(Node::set),
        ]
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn serializing_serialized_output_is_stable(node in node_strategy()) {
        let once = serialize(&node);
        let twice = serialize(&Node::from(once.clone()));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn self_reference_terminates_with_marker(payload in node_strategy()) {
        let root = MapRef::new();
        root.insert("payload", payload.clone());
        root.insert("self", Node::Map(root.clone()));

        let json = serialize(&Node::Map(root));
        prop_assert_eq!(&json["self"], &json!(CIRCULAR_MARKER));
        prop_assert_eq!(&json["payload"], &serialize(&payload));
    }

    #[test]
    fn cycle_through_nested_list_is_marked(depth in 1usize..6) {
        let root = MapRef::new();
        let mut cursor = Node::Map(root.clone());
        for _ in 0..depth {
            cursor = Node::list([cursor]);
        }
        root.insert("loop", cursor);

        let mut json = serialize(&Node::Map(root));
        let mut probe = json["loop"].take();
        for _ in 0..depth {
            probe = probe[0].take();
        }
        prop_assert_eq!(probe, json!(CIRCULAR_MARKER));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn nested_back_reference_to_root() {
    let root = MapRef::new();
    root.insert("a", 1);
    let inner = MapRef::new();
    inner.insert("c", Node::Map(root.clone()));
    root.insert("b", Node::Map(inner));

    let json = serialize(&Node::Map(root));
    assert_eq!(json, json!({"a": 1, "b": {"c": CIRCULAR_MARKER}}));
}

#[test]
fn same_map_twice_in_one_list_is_not_circular() {
    let shared = MapRef::new();
    shared.insert(Key::Int(1), true);

    let json = serialize(&Node::list([Node::Map(shared.clone()), Node::Map(shared)]));
    assert_eq!(json, json!([{"1": true}, {"1": true}]));
}
