//! Proptest strategies for JSON values and trip documents.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Arbitrary JSON, including any finite float.
pub fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(|f| json!(f)),
        ".{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-zA-Z0-9_]{0,10}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Note text drawn from plain words and a few badge emoji.
pub fn arb_note() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,8}",
            Just("🏖️".to_string()),
            Just("⛩".to_string()),
            Just("🍡".to_string()),
            Just("✈️".to_string()),
            Just("☕".to_string()),
        ],
        0..5,
    )
    .prop_map(|words| words.join(" "))
}

pub fn arb_pin() -> impl Strategy<Value = Value> {
    (
        "[A-D]",
        prop::option::of((-90i32..90, -180i32..180)),
    )
        .prop_map(|(name, ll)| match ll {
            Some((lat, lng)) => json!({ "name": name, "q": name, "ll": [lat, lng] }),
            None => json!({ "name": name, "q": name }),
        })
}

pub fn arb_day() -> impl Strategy<Value = Value> {
    (
        prop_oneof!["[0-9]{1,2}", "[a-z]{1,3}"],
        prop::collection::vec(arb_note(), 0..4),
        prop::collection::vec(arb_pin(), 0..4),
    )
        .prop_map(|(id, notes, pins)| json!({ "id": id, "notes": notes, "pins": pins }))
}

/// A structurally valid trip, optionally carrying its own `ll` table.
pub fn arb_trip() -> impl Strategy<Value = Value> {
    (
        "[A-Za-z ]{0,20}",
        prop::collection::vec(arb_day(), 0..6),
        prop::option::of(prop::collection::vec(("[A-D]", -90i32..90, -180i32..180), 0..3)),
    )
        .prop_map(|(title, days, ll)| {
            let mut trip = json!({
                "tripConfig": { "title": title },
                "days": days,
            });
            if let Some(entries) = ll {
                let table: Map<String, Value> = entries
                    .into_iter()
                    .map(|(name, lat, lng)| (name, json!([lat, lng])))
                    .collect();
                trip["ll"] = Value::Object(table);
            }
            trip
        })
}
