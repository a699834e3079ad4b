/// tripkit - shareable trip itineraries
///
/// Core library for encoding trip documents into URL-safe tokens, resolving
/// which source supplies a trip at load time, and mirroring edits into
/// device-local storage and the page address.

pub mod config;
pub mod core;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
