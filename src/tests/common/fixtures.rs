//! Test Fixtures

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::core::address::Address;
use crate::core::mirror::PersistenceMirror;
use crate::core::remote::JsonFetcher;
use crate::core::resolver::TripResolver;
use crate::core::session::TripSession;
use crate::core::storage::MemoryStore;
use crate::core::trip::Palette;

pub const DRAFT_KEY: &str = "tripkit.draft";
pub const APP_URL: &str = "https://trips.example/app/";

/// Palette with a single `card` class.
pub fn card_palette() -> Palette {
    let mut palette = Palette::new();
    palette.insert("card".to_string(), json!("x"));
    palette
}

/// One beach day with an emoji note and no derived tables.
pub fn beach_trip() -> Value {
    json!({
        "tripConfig": { "title": "T" },
        "days": [{ "id": "1", "notes": ["Beach 🏖️"] }],
        "flights": []
    })
}

/// Session over an in-memory store, opened at `APP_URL` + `fragment`.
pub fn memory_session(
    store: Arc<MemoryStore>,
    fetcher: Arc<dyn JsonFetcher>,
    fragment: &str,
) -> TripSession<Arc<MemoryStore>> {
    let mirror = Arc::new(PersistenceMirror::new(store, DRAFT_KEY));
    let resolver = TripResolver::new(fetcher, mirror.clone(), card_palette())
        .with_itineraries_base("itineraries");
    let address = Address::parse(&format!("{APP_URL}{fragment}")).expect("valid test address");
    TripSession::new(resolver, mirror, address, Duration::from_millis(1000))
}
