//! Trip Normalizer
//!
//! Brings a validated JSON candidate into canonical document shape:
//! - every day has `pins` and `notes` arrays
//! - `ll` holds coordinates for every pinned location name
//! - `dayBadges` is derived from note emoji when the document has none
//! - `flights` and `palette` get defaults when absent
//!
//! The output is deserialized from the input, so it owns all of its data.
//! Nothing else is dropped: values the typed model cannot read are carried
//! through unchanged.

use indexmap::IndexSet;
use serde_json::{Map, Value};

use super::model::{numeric_day_key, BadgeTable, DayEntry, LocationTable, Palette, TripDocument};

/// Canonicalize `parsed` into a [`TripDocument`].
///
/// `parsed` is expected to have passed [`super::validator::check`]; anything
/// else yields a document with default fields rather than an error.
pub fn normalize(parsed: &Value, fallback_palette: &Palette) -> TripDocument {
    let mut doc: TripDocument = serde_json::from_value(canonical_shape(parsed)).unwrap_or_else(|e| {
        log::warn!("Trip data could not be read, using an empty document: {}", e);
        TripDocument::default()
    });

    doc.ll = merge_locations(std::mem::take(&mut doc.ll), &doc.days);

    if !has_badges(parsed.get("dayBadges")) {
        doc.day_badges = derive_badges(&doc.days);
    }

    let palette_present = parsed
        .get("palette")
        .is_some_and(|p| !p.is_null());
    if !palette_present {
        doc.palette = fallback_palette.clone();
    }

    doc
}

/// Copy of `parsed` with array-valued collections where the document shape
/// requires them.
fn canonical_shape(parsed: &Value) -> Value {
    let mut value = parsed.clone();
    if let Value::Object(doc) = &mut value {
        ensure_array(doc, "flights");
        if let Some(Value::Array(days)) = doc.get_mut("days") {
            for day in days.iter_mut().filter_map(Value::as_object_mut) {
                ensure_array(day, "pins");
                ensure_array(day, "notes");
            }
        }
    }
    value
}

fn ensure_array(object: &mut Map<String, Value>, key: &str) {
    if !object.get(key).is_some_and(Value::is_array) {
        object.insert(key.to_string(), Value::Array(Vec::new()));
    }
}

/// A badge table counts as present unless it is missing, `null` or empty.
fn has_badges(table: Option<&Value>) -> bool {
    match table {
        Some(Value::Object(entries)) => !entries.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

/// Add an entry for every pin name not already in the table. Existing
/// entries win, then pins in document order.
pub fn merge_locations(mut table: LocationTable, days: &[DayEntry]) -> LocationTable {
    for pin in days.iter().flat_map(|d| d.pins.iter()) {
        if let Some(ll) = pin.ll {
            if !table.contains_key(&pin.name) {
                table.insert(pin.name.clone(), ll);
            }
        }
    }
    table
}

/// Emoji found in each numbered day's notes, de-duplicated in first-seen
/// order. Days without emoji or without a numeric id get no entry.
pub fn derive_badges(days: &[DayEntry]) -> BadgeTable {
    let mut badges = BadgeTable::new();
    for day in days {
        let Some(key) = numeric_day_key(&day.id) else {
            continue;
        };

        let found: IndexSet<String> = day
            .notes
            .iter()
            .flat_map(|note| note.chars())
            .filter(|c| is_badge_emoji(*c))
            .map(String::from)
            .collect();

        if !found.is_empty() {
            badges.insert(key, found.into_iter().collect());
        }
    }
    badges
}

/// Symbol, pictograph and dingbat code points.
pub fn is_badge_emoji(c: char) -> bool {
    matches!(c as u32, 0x1F300..=0x1FAFF | 0x2600..=0x27BF)
}
