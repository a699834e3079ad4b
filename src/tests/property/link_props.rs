//! Property-based tests for shareable links
//!
//! Tests invariants:
//! - An embedded link decodes back to the document it was built from
//! - A link never carries more than one trip reference
//! - Shorthand names always map to a `.json` file with no path segments

use proptest::prelude::*;
use url::Url;

use crate::core::address::{itinerary_file_name, Address};
use crate::core::mirror::{build_shareable_link, LinkOptions};
use crate::core::trip::{decode, normalize};
use crate::tests::common::strategies::arb_trip;
use crate::tests::common::{card_palette, APP_URL};

proptest! {
    #[test]
    fn prop_embedded_link_round_trips(trip in arb_trip(), view in any::<bool>()) {
        let doc = normalize(&trip, &card_palette());
        let options = LinkOptions { view_only: view, ..Default::default() };
        let link = build_shareable_link(&Url::parse(APP_URL).unwrap(), &doc, &options).unwrap();

        let refs = Address::parse(&link).unwrap().references();
        prop_assert_eq!(refs.view_only, view);
        prop_assert!(refs.cloud.is_none());
        prop_assert!(refs.external.is_none());
        prop_assert_eq!(decode(&refs.embedded.unwrap()), Some(doc.to_value()));
    }

    #[test]
    fn prop_source_link_has_one_reference(
        trip in arb_trip(),
        host in "[a-z]{1,10}",
        file in "[a-z0-9]{1,10}",
    ) {
        let doc = normalize(&trip, &card_palette());
        let options = LinkOptions {
            source_url: Some(format!("https://{host}.example/{file}.json")),
            view_only: false,
            itineraries_base: "itineraries".to_string(),
        };
        let link = build_shareable_link(&Url::parse(APP_URL).unwrap(), &doc, &options).unwrap();

        let refs = Address::parse(&link).unwrap().references();
        prop_assert!(refs.external.is_some());
        prop_assert!(refs.embedded.is_none());
        prop_assert!(refs.cloud.is_none());
    }

    #[test]
    fn prop_itinerary_names_stay_in_directory(name in "[A-Za-z0-9._/-]{0,20}") {
        if let Some(file) = itinerary_file_name(&name) {
            prop_assert!(file.ends_with(".json"));
            prop_assert!(!file.contains('/'));
            prop_assert!(!file.contains(".."));
        }
    }
}
