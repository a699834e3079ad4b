//! Trip Validator
//!
//! Shallow structural gate for untrusted JSON before it becomes a trip
//! document. Only the top-level shape is checked; day and flight records are
//! left to the forgiving deserializers in [`super::model`].

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::model::{Palette, TripDocument};
use super::normalizer::normalize;

// ============================================================================
// Error Types
// ============================================================================

/// Structural problems, in the order they are checked. The display text is
/// shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Trip data must be a JSON object")]
    NotAnObject,

    #[error("Missing or invalid \"tripConfig\" (expected an object)")]
    TripConfig,

    #[error("Missing or invalid \"days\" (expected an array)")]
    Days,

    #[error("Invalid \"flights\" (expected an array)")]
    Flights,

    #[error("Invalid \"palette\" (expected an object)")]
    Palette,
}

impl ValidationError {
    /// Name of the offending field, if the failure is about one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::NotAnObject => None,
            ValidationError::TripConfig => Some("tripConfig"),
            ValidationError::Days => Some("days"),
            ValidationError::Flights => Some("flights"),
            ValidationError::Palette => Some("palette"),
        }
    }
}

/// Outcome of [`validate`], shaped for callers that report to a UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid { error: String },
}

/// `{"valid": true}` or `{"valid": false, "error": "..."}`.
impl Serialize for Validation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Validation::Valid => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("valid", &true)?;
                map.end()
            }
            Validation::Invalid { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("valid", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Validation::Valid => None,
            Validation::Invalid { error } => Some(error),
        }
    }
}

/// Errors from importing user-supplied JSON text.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

// ============================================================================
// Validation
// ============================================================================

/// Check a parsed candidate, stopping at the first failure.
pub fn check(candidate: &Value) -> Result<(), ValidationError> {
    let obj = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

    if !obj.get("tripConfig").is_some_and(Value::is_object) {
        return Err(ValidationError::TripConfig);
    }

    if !obj.get("days").is_some_and(Value::is_array) {
        return Err(ValidationError::Days);
    }

    match obj.get("flights") {
        None | Some(Value::Null) | Some(Value::Array(_)) => {}
        Some(_) => return Err(ValidationError::Flights),
    }

    match obj.get("palette") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => return Err(ValidationError::Palette),
    }

    Ok(())
}

/// Total form of [`check`]: never fails, reports the first problem found.
pub fn validate(candidate: &Value) -> Validation {
    match check(candidate) {
        Ok(()) => Validation::Valid,
        Err(e) => Validation::Invalid {
            error: e.to_string(),
        },
    }
}

/// Parse, validate and normalize JSON text supplied by the user.
pub fn import_json(text: &str, fallback_palette: &Palette) -> Result<TripDocument, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    check(&value)?;
    Ok(normalize(&value, fallback_palette))
}
