//! Trip Document Model
//!
//! Typed representation of the itinerary document that is shared through
//! links, mirrored into device-local storage and stored in cloud rows.
//!
//! Records read leniently: fields of the wrong type fall back to their
//! defaults instead of failing the whole document. Whatever the typed form
//! cannot hold (unknown keys, values of the wrong type, unreadable list
//! elements) is kept in `extra` and written back in place, so a load/save
//! cycle never drops data written by another client.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::record::{Object, Reader, Writer};

// ============================================================================
// Type Aliases
// ============================================================================

/// A `[lat, lng]` coordinate pair.
pub type LatLng = [f64; 2];

/// Theme class names keyed by slot. Opaque to this crate.
pub type Palette = Map<String, Value>;

/// Location name -> coordinates, in first-seen order.
pub type LocationTable = IndexMap<String, LatLng>;

/// Day id (canonical number text) -> emoji markers, in first-seen order.
pub type BadgeTable = IndexMap<String, Vec<String>>;

// ============================================================================
// Records
// ============================================================================

/// A JSON object with typed fields and raw leftovers.
///
/// Equality compares the written form.
trait Record: Sized {
    fn read(reader: &mut Reader) -> Self;

    fn extra(&self) -> &Object;

    fn write(&self, writer: &mut Writer) -> serde_json::Result<()>;

    fn to_object(&self) -> serde_json::Result<Object> {
        let mut writer = Writer::new(self.extra());
        self.write(&mut writer)?;
        Ok(writer.finish())
    }
}

macro_rules! record_serde {
    ($($ty:ty),* $(,)?) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.to_object()
                    .map_err(<S::Error as serde::ser::Error>::custom)?
                    .serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let mut reader = Reader::new(Value::deserialize(deserializer)?)
                    .ok_or_else(|| <D::Error as serde::de::Error>::custom("expected an object"))?;
                let mut record = <$ty as Record>::read(&mut reader);
                record.extra = reader.finish();
                Ok(record)
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.to_object().ok() == other.to_object().ok()
            }
        }
    )*};
}

record_serde!(TripDocument, TripConfig, CalendarConfig, BadgeLegendEntry, Flight, DayEntry, Pin);

// ============================================================================
// Document
// ============================================================================

/// The unit of persistence and sharing.
#[derive(Debug, Clone, Default)]
pub struct TripDocument {
    pub trip_config: TripConfig,
    pub flights: Vec<Flight>,
    pub days: Vec<DayEntry>,
    pub ll: LocationTable,
    pub day_badges: BadgeTable,
    pub palette: Palette,
    /// Keys this crate does not interpret, and originals of fields that did
    /// not read cleanly.
    pub extra: Map<String, Value>,
}

impl Record for TripDocument {
    fn read(r: &mut Reader) -> Self {
        Self {
            trip_config: r.field("tripConfig"),
            flights: r.list("flights"),
            days: r.list("days"),
            ll: r.table("ll"),
            day_badges: r.table("dayBadges"),
            palette: r.field("palette"),
            extra: Object::new(),
        }
    }

    fn extra(&self) -> &Object {
        &self.extra
    }

    fn write(&self, w: &mut Writer) -> serde_json::Result<()> {
        w.field("tripConfig", &self.trip_config)?;
        w.list("flights", &self.flights)?;
        w.list("days", &self.days)?;
        w.table("ll", &self.ll)?;
        w.table("dayBadges", &self.day_badges)?;
        w.field("palette", &self.palette)
    }
}

/// Title, footer, calendar anchor and badge legend.
#[derive(Debug, Clone, Default)]
pub struct TripConfig {
    pub title: String,
    pub footer: String,
    pub favicon: Option<String>,
    pub calendar: CalendarConfig,
    pub badge_legend: Vec<BadgeLegendEntry>,
    pub extra: Map<String, Value>,
}

impl Record for TripConfig {
    fn read(r: &mut Reader) -> Self {
        Self {
            title: r.field("title"),
            footer: r.field("footer"),
            favicon: r.optional("favicon"),
            calendar: r.field("calendar"),
            badge_legend: r.list("badgeLegend"),
            extra: Object::new(),
        }
    }

    fn extra(&self) -> &Object {
        &self.extra
    }

    fn write(&self, w: &mut Writer) -> serde_json::Result<()> {
        w.field("title", &self.title)?;
        w.field("footer", &self.footer)?;
        w.optional("favicon", &self.favicon)?;
        w.field("calendar", &self.calendar)?;
        w.list("badgeLegend", &self.badge_legend)
    }
}

/// Month shown by the calendar view.
#[derive(Debug, Clone, Default)]
pub struct CalendarConfig {
    pub year: i32,
    /// Zero-based month (0 = January).
    pub month: u32,
    pub extra: Map<String, Value>,
}

impl Record for CalendarConfig {
    fn read(r: &mut Reader) -> Self {
        Self {
            year: r.field("year"),
            month: r.field("month"),
            extra: Object::new(),
        }
    }

    fn extra(&self) -> &Object {
        &self.extra
    }

    fn write(&self, w: &mut Writer) -> serde_json::Result<()> {
        w.field("year", &self.year)?;
        w.field("month", &self.month)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BadgeLegendEntry {
    pub emoji: String,
    pub label: String,
    pub extra: Map<String, Value>,
}

impl Record for BadgeLegendEntry {
    fn read(r: &mut Reader) -> Self {
        Self {
            emoji: r.field("emoji"),
            label: r.field("label"),
            extra: Object::new(),
        }
    }

    fn extra(&self) -> &Object {
        &self.extra
    }

    fn write(&self, w: &mut Writer) -> serde_json::Result<()> {
        w.field("emoji", &self.emoji)?;
        w.field("label", &self.label)
    }
}

/// A flight leg. Every field is free text.
#[derive(Debug, Clone, Default)]
pub struct Flight {
    pub title: String,
    pub num: String,
    pub route: String,
    pub date: String,
    pub times: String,
    pub codes: String,
    pub extra: Map<String, Value>,
}

impl Record for Flight {
    fn read(r: &mut Reader) -> Self {
        Self {
            title: r.field("title"),
            num: r.field("num"),
            route: r.field("route"),
            date: r.field("date"),
            times: r.field("times"),
            codes: r.field("codes"),
            extra: Object::new(),
        }
    }

    fn extra(&self) -> &Object {
        &self.extra
    }

    fn write(&self, w: &mut Writer) -> serde_json::Result<()> {
        w.field("title", &self.title)?;
        w.field("num", &self.num)?;
        w.field("route", &self.route)?;
        w.field("date", &self.date)?;
        w.field("times", &self.times)?;
        w.field("codes", &self.codes)
    }
}

/// One calendar day of the itinerary.
#[derive(Debug, Clone, Default)]
pub struct DayEntry {
    /// Calendar day number and fragment anchor. Numbers are accepted on
    /// input and kept as text.
    pub id: String,
    pub dow: String,
    pub date: String,
    pub iso_date: Option<String>,
    pub title: String,
    pub notes: Vec<String>,
    pub photos: Vec<String>,
    /// Search query used when `photos` is empty.
    pub photo_q: Option<String>,
    pub pins: Vec<Pin>,
    pub has_map: bool,
    pub extra: Map<String, Value>,
}

impl Record for DayEntry {
    fn read(r: &mut Reader) -> Self {
        Self {
            id: r.field_with("id", scalar_text),
            dow: r.field("dow"),
            date: r.field("date"),
            iso_date: r.optional("isoDate"),
            title: r.field("title"),
            notes: r.list("notes"),
            photos: r.list("photos"),
            photo_q: r.optional("photoQ"),
            pins: r.list("pins"),
            has_map: r.field("hasMap"),
            extra: Object::new(),
        }
    }

    fn extra(&self) -> &Object {
        &self.extra
    }

    fn write(&self, w: &mut Writer) -> serde_json::Result<()> {
        w.field_with("id", &self.id, scalar_text)?;
        w.field("dow", &self.dow)?;
        w.field("date", &self.date)?;
        w.optional("isoDate", &self.iso_date)?;
        w.field("title", &self.title)?;
        w.list("notes", &self.notes)?;
        w.list("photos", &self.photos)?;
        w.optional("photoQ", &self.photo_q)?;
        w.list("pins", &self.pins)?;
        w.field("hasMap", &self.has_map)
    }
}

/// A location plotted on a day's map.
#[derive(Debug, Clone, Default)]
pub struct Pin {
    pub name: String,
    pub q: String,
    pub ll: Option<LatLng>,
    pub extra: Map<String, Value>,
}

impl Record for Pin {
    fn read(r: &mut Reader) -> Self {
        Self {
            name: r.field("name"),
            q: r.field("q"),
            ll: r.optional("ll"),
            extra: Object::new(),
        }
    }

    fn extra(&self) -> &Object {
        &self.extra
    }

    fn write(&self, w: &mut Writer) -> serde_json::Result<()> {
        w.field("name", &self.name)?;
        w.field("q", &self.q)?;
        w.optional("ll", &self.ll)
    }
}

impl TripDocument {
    /// Blank scaffold offered from onboarding: one empty day anchored on the
    /// given month.
    pub fn blank(year: i32, month: u32) -> Self {
        Self {
            trip_config: TripConfig {
                title: "My Trip".to_string(),
                calendar: CalendarConfig {
                    year,
                    month: month.min(11),
                    ..Default::default()
                },
                ..Default::default()
            },
            flights: Vec::new(),
            days: vec![DayEntry {
                id: "1".to_string(),
                ..Default::default()
            }],
            ll: LocationTable::new(),
            day_badges: BadgeTable::new(),
            palette: Palette::new(),
            extra: Map::new(),
        }
    }

    /// First day with the given id. Duplicate ids resolve to the earliest.
    pub fn day(&self, id: &str) -> Option<&DayEntry> {
        self.days.iter().find(|d| d.id == id)
    }

    /// Coordinates for a location name from the lookup table.
    pub fn coordinates(&self, name: &str) -> Option<LatLng> {
        self.ll.get(name).copied()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_object().unwrap_or_default())
    }
}

/// Coerce a day id to its canonical number text, the way a calendar key is
/// derived. Blank or non-numeric ids yield `None`.
pub fn numeric_day_key(id: &str) -> Option<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return None;
    }
    let n: f64 = trimmed.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Some(format!("{}", n as i64))
    } else {
        Some(n.to_string())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
