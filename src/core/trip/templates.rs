//! Built-in trip templates offered from onboarding.

use serde_json::{json, Value};

use super::model::{Palette, TripDocument};
use super::normalizer::normalize;

const KYOTO: &str = include_str!("templates/kyoto.json");

/// Names accepted by [`builtin`].
pub const TEMPLATE_NAMES: &[&str] = &["kyoto"];

pub fn names() -> &'static [&'static str] {
    TEMPLATE_NAMES
}

/// Load a template by name, normalized like any other source.
pub fn builtin(name: &str, fallback_palette: &Palette) -> Option<TripDocument> {
    let raw = match name {
        "kyoto" => KYOTO,
        _ => return None,
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some(normalize(&value, fallback_palette)),
        Err(e) => {
            log::error!("Built-in template {} is not valid JSON: {}", name, e);
            None
        }
    }
}

/// Theme classes used when a document does not bring its own palette.
pub fn default_palette() -> Palette {
    let value = json!({
        "page": "bg-stone-50",
        "card": "bg-white",
        "accent": "text-sky-700",
        "muted": "text-stone-500",
        "badge": "bg-sky-100"
    });
    match value {
        Value::Object(map) => map,
        _ => Palette::new(),
    }
}
