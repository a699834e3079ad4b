//! Property-based tests for the codec
//!
//! Tests invariants:
//! - `decode(encode(v)) == v` for JSON values
//! - Tokens only use the URL-fragment-safe alphabet
//! - Arbitrary input never panics the decoder

use proptest::prelude::*;

use crate::core::trip::codec::{decode, decode_document, encode};
use crate::tests::common::card_palette;
use crate::tests::common::strategies::arb_json;

fn is_fragment_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

proptest! {
    #[test]
    fn prop_round_trip(value in arb_json()) {
        let token = encode(&value).expect("JSON values always encode");
        prop_assert_eq!(decode(&token), Some(value));
    }

    #[test]
    fn prop_token_alphabet(value in arb_json()) {
        let token = encode(&value).expect("JSON values always encode");
        prop_assert!(token.chars().all(is_fragment_safe), "token {}", token);
    }

    #[test]
    fn prop_encode_is_deterministic(value in arb_json()) {
        prop_assert_eq!(encode(&value), encode(&value));
    }

    #[test]
    fn prop_garbage_never_panics(input in ".{0,200}") {
        let _ = decode(&input);
        let _ = decode_document(&input, &card_palette());
    }

    #[test]
    fn prop_truncated_tokens_never_panic(value in arb_json(), cut in 0usize..64) {
        let token = encode(&value).expect("JSON values always encode");
        let end = token.len().saturating_sub(cut);
        let _ = decode(&token[..end]);
    }
}
