//! Property-based tests for the normalizer
//!
//! Tests invariants:
//! - Normalizing twice equals normalizing once
//! - Every located pin name ends up in the location table
//! - Entries already in the table are never overwritten
//! - Pins and notes pass through untouched
//! - A non-empty badge table passes through unchanged

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::core::trip::normalize;
use crate::tests::common::card_palette;
use crate::tests::common::strategies::arb_trip;

proptest! {
    #[test]
    fn prop_idempotent(trip in arb_trip()) {
        let palette = card_palette();
        let once = normalize(&trip, &palette);
        let twice = normalize(&once.to_value(), &palette);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_located_pins_are_in_table(trip in arb_trip()) {
        let doc = normalize(&trip, &card_palette());
        for day in &doc.days {
            for pin in &day.pins {
                if pin.ll.is_some() {
                    prop_assert!(doc.ll.contains_key(&pin.name), "missing {}", pin.name);
                }
            }
        }
    }

    #[test]
    fn prop_explicit_table_wins(trip in arb_trip()) {
        let doc = normalize(&trip, &card_palette());
        if let Some(Value::Object(table)) = trip.get("ll") {
            for (name, coords) in table {
                let expected: [f64; 2] = serde_json::from_value(coords.clone()).unwrap();
                prop_assert_eq!(doc.ll.get(name).copied(), Some(expected));
            }
        }
    }

    #[test]
    fn prop_pins_and_notes_untouched(trip in arb_trip()) {
        let doc = normalize(&trip, &card_palette());
        let days = trip["days"].as_array().unwrap();
        prop_assert_eq!(doc.days.len(), days.len());
        for (day, raw) in doc.days.iter().zip(days) {
            prop_assert_eq!(
                serde_json::to_value(&day.notes).unwrap(),
                raw["notes"].clone()
            );
            prop_assert_eq!(day.pins.len(), raw["pins"].as_array().unwrap().len());
            for (pin, raw_pin) in day.pins.iter().zip(raw["pins"].as_array().unwrap()) {
                prop_assert_eq!(&pin.name, raw_pin["name"].as_str().unwrap());
                prop_assert_eq!(pin.ll.is_some(), raw_pin.get("ll").is_some());
            }
        }
    }

    #[test]
    fn prop_existing_badges_pass_through(mut trip in arb_trip()) {
        trip["dayBadges"] = json!({ "1": ["✅"] });
        let doc = normalize(&trip, &card_palette());
        prop_assert_eq!(doc.day_badges.len(), 1);
        prop_assert_eq!(doc.day_badges["1"].clone(), vec!["✅".to_string()]);
    }
}
