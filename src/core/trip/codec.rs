//! Trip Codec
//!
//! Compresses a trip document into a token that can sit in a URL fragment
//! without percent-encoding, and back.
//!
//! Format: compact JSON text, raw DEFLATE, base64url without padding. The
//! token alphabet is `[A-Za-z0-9_-]`.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::model::{Palette, TripDocument};
use super::normalizer::normalize;
use super::validator::check;

/// Upper bound on inflated JSON size accepted from a token.
pub const MAX_DECODED_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Token is empty")]
    Empty,

    #[error("Token is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Compression failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decoded token exceeds {MAX_DECODED_BYTES} bytes")]
    TooLarge,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;

// ============================================================================
// Total API
// ============================================================================

/// Encode any serializable value into a fragment-safe token.
///
/// Returns `None` if the value cannot be represented as JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    match try_encode(value) {
        Ok(token) => Some(token),
        Err(e) => {
            log::debug!("Trip encode failed: {}", e);
            None
        }
    }
}

/// Decode a token back into a JSON value. Never panics; any failure is `None`.
pub fn decode(token: &str) -> Option<Value> {
    match try_decode(token) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Trip decode failed: {}", e);
            None
        }
    }
}

/// Decode a token and bring it into canonical document shape.
///
/// Returns `None` when the token does not decode or the payload is not a
/// structurally valid trip document.
pub fn decode_document(token: &str, fallback_palette: &Palette) -> Option<TripDocument> {
    let value = decode(token)?;
    if let Err(e) = check(&value) {
        log::debug!("Decoded token is not a trip document: {}", e);
        return None;
    }
    Some(normalize(&value, fallback_palette))
}

// ============================================================================
// Fallible Internals
// ============================================================================

pub fn try_encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;

    let mut encoder = DeflateEncoder::new(Vec::with_capacity(json.len() / 2), Compression::best());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

pub fn try_decode(token: &str) -> Result<Value> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CodecError::Empty);
    }

    let compressed = URL_SAFE_NO_PAD.decode(token)?;

    let mut json = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .take(MAX_DECODED_BYTES + 1)
        .read_to_end(&mut json)?;
    if json.len() as u64 > MAX_DECODED_BYTES {
        return Err(CodecError::TooLarge);
    }

    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("not representable"))
        }
    }

    #[test]
    fn test_simple_round_trip() {
        let token = encode(&json!({"a": 1})).unwrap();
        assert_eq!(decode(&token), Some(json!({"a": 1})));
    }

    #[test]
    fn test_floats_round_trip_exactly() {
        let value = json!({
            "ll": [35.011636, 135.76803700000001],
            "odd": [0.1, -0.0, 1e-7, 2.2250738585072014e-308, 5e-324, 1.7976931348623157e308],
            "third": 1.0 / 3.0
        });
        let token = encode(&value).unwrap();
        assert_eq!(decode(&token), Some(value));
    }

    #[test]
    fn test_invalid_token_is_none() {
        assert_eq!(decode("not-a-valid-token"), None);
        assert_eq!(decode("AAAA"), None);
        assert_eq!(decode("%%%"), None);
    }

    #[test]
    fn test_empty_token_is_none() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("   "), None);
        assert!(matches!(try_decode(""), Err(CodecError::Empty)));
    }

    #[test]
    fn test_unrepresentable_value_is_none() {
        assert_eq!(encode(&Unrepresentable), None);
    }

    #[test]
    fn test_token_alphabet_is_fragment_safe() {
        let doc = json!({
            "tripConfig": {"title": "Tōkyō & Kyōto / 2025?", "footer": "#hash=+"},
            "days": [{"id": "1", "notes": ["🍣 sushi", "a+b=c"]}]
        });
        let token = encode(&doc).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_repetitive_document_compresses() {
        let days: Vec<Value> = (1..=30)
            .map(|i| {
                json!({
                    "id": i.to_string(),
                    "dow": "Mon",
                    "title": "Walk around the old town",
                    "notes": ["Breakfast at the hotel", "Museum in the afternoon"],
                    "photos": [],
                    "pins": [{"name": "Old Town", "q": "old town", "ll": [35.0, 135.7]}],
                    "hasMap": true
                })
            })
            .collect();
        let doc = json!({"tripConfig": {"title": "Long trip"}, "days": days});
        let raw = serde_json::to_string(&doc).unwrap();
        let token = encode(&doc).unwrap();
        assert!(token.len() < raw.len() / 2, "{} vs {}", token.len(), raw.len());
    }

    #[test]
    fn test_decode_document_rejects_non_trip_payload() {
        let token = encode(&json!({"a": 1})).unwrap();
        assert!(decode_document(&token, &Palette::new()).is_none());
    }

    #[test]
    fn test_decode_document_normalizes() {
        let token = encode(&json!({
            "tripConfig": {"title": "T"},
            "days": [{"id": "1", "pins": [{"name": "A", "q": "a", "ll": [1.0, 2.0]}]}]
        }))
        .unwrap();
        let doc = decode_document(&token, &Palette::new()).unwrap();
        assert_eq!(doc.coordinates("A"), Some([1.0, 2.0]));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let token = encode(&json!([1, 2, 3])).unwrap();
        assert_eq!(decode(&format!("  {token}\n")), Some(json!([1, 2, 3])));
    }
}
