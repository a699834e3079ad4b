//! Remote collaborators: the hosted trip table and external JSON sources.

pub mod cloud;
pub mod fetch;
pub mod rest;

pub use cloud::{
    fetch_row, save_trip, share_token, slugify, CloudError, CloudTripService, NewTripRow,
    SaveOptions, TripRow, UpdateTripRow, Visibility,
};
pub use fetch::{FetchError, HttpJsonFetcher, JsonFetcher};
pub use rest::RestTripService;
