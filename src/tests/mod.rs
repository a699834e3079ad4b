//! Crate-level test suites.
//!
//! Unit tests live next to the code they cover. The suites here exercise
//! several modules together:
//!
//! - `property`: proptest invariants for the codec, normalizer, validator
//!   and link building
//! - `scenario_tests`: load, edit and share flows through a session

mod common;
mod property;
