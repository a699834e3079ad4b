//! Trip document core: model, codec, validation and normalization.
//!
//! Every function here is a stateless transform. The session shell in
//! [`crate::core::session`] owns the only mutable document.

pub mod codec;
pub mod model;
pub mod normalizer;
mod record;
pub mod templates;
pub mod validator;

pub use codec::{decode, decode_document, encode, CodecError};
pub use model::{
    numeric_day_key, BadgeLegendEntry, BadgeTable, CalendarConfig, DayEntry, Flight, LatLng,
    LocationTable, Palette, Pin, TripConfig, TripDocument,
};
pub use normalizer::normalize;
pub use validator::{check, import_json, validate, ImportError, Validation, ValidationError};
