//! Property-based tests for trip documents
//!
//! Invariants checked over generated inputs rather than fixed cases.
//!
//! ## Running Property Tests
//!
//! ```sh
//! cargo test property --release
//! ```
//!
//! ## Test Modules
//!
//! - `codec_props`: tokens round-trip, stay fragment-safe, and garbage
//!   never panics
//! - `normalizer_props`: second pass changes nothing, explicit tables win,
//!   pins are never rewritten
//! - `validator_props`: failures follow the check order; fixing a field
//!   never surfaces an earlier failure
//! - `link_props`: shareable links resolve back to the same document
//!
//! By default proptest runs 256 cases per property; set `PROPTEST_CASES` to
//! change it.

mod codec_props;
mod link_props;
mod normalizer_props;
mod validator_props;
