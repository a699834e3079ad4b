//! Common Test Utilities
//!
//! Shared fixtures and proptest strategies for trip documents.

pub mod fixtures;
pub mod strategies;

pub use fixtures::*;
