//! Source Resolver
//!
//! Picks the one source that supplies the session's trip. Tiers are tried in
//! a fixed order and the first one that loads wins:
//!
//! 1. cloud reference (`cloud=`, `t=`, `share=`)
//! 2. external JSON (`source=` or a shorthand name)
//! 3. embedded token (`trip=`)
//! 4. local draft
//!
//! A cloud or external reference that fails ends resolution in onboarding
//! with the error. An unreadable token or draft just falls through.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::core::address::{itinerary_url, Address, CloudRef, ExternalRef, References};
use crate::core::mirror::{CloudLink, PersistenceMirror};
use crate::core::remote::{fetch_row, CloudError, CloudTripService, FetchError, JsonFetcher};
use crate::core::storage::DraftStore;
use crate::core::trip::{check, decode_document, normalize, Palette, TripDocument, ValidationError};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Cloud,
    External,
    Embedded,
    Local,
}

/// A trip plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTrip {
    pub trip: TripDocument,
    pub mode: SourceMode,
    pub view_only: bool,
    /// URL of the external document, for link building.
    pub source_url: Option<String>,
    /// Reference the cloud row was loaded by.
    pub cloud: Option<CloudRef>,
    /// Row id of the cloud trip, for saving back.
    pub cloud_id: Option<String>,
    /// Slug and share token of the cloud row, for link building.
    pub cloud_link: Option<CloudLink>,
}

impl LoadedTrip {
    fn new(trip: TripDocument, mode: SourceMode, view_only: bool) -> Self {
        Self {
            trip,
            mode,
            view_only,
            source_url: None,
            cloud: None,
            cloud_id: None,
            cloud_link: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("This link points to a cloud trip, but no cloud service is configured")]
    CloudUnavailable,

    #[error("Could not load cloud trip: {0}")]
    Cloud(#[from] CloudError),

    #[error("Cloud trip not found")]
    CloudNotFound,

    #[error("Could not load trip from {url}: {source}")]
    External {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Invalid itinerary location: {0}")]
    InvalidSource(String),

    #[error("Loaded trip is invalid: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug)]
pub enum Resolution {
    Loaded(LoadedTrip),
    /// Nothing to show: the caller offers template, blank or import.
    Onboarding { error: Option<ResolveError> },
}

impl Resolution {
    pub fn loaded(&self) -> Option<&LoadedTrip> {
        match self {
            Resolution::Loaded(loaded) => Some(loaded),
            Resolution::Onboarding { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ResolveError> {
        match self {
            Resolution::Onboarding { error } => error.as_ref(),
            Resolution::Loaded(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Cloud,
    External,
    Embedded,
    Local,
}

const TIERS: [Tier; 4] = [Tier::Cloud, Tier::External, Tier::Embedded, Tier::Local];

enum Outcome {
    Skip,
    Loaded(LoadedTrip),
    Failed(ResolveError),
}

// ============================================================================
// Resolver
// ============================================================================

pub struct TripResolver<S> {
    cloud: Option<Arc<dyn CloudTripService>>,
    fetcher: Arc<dyn JsonFetcher>,
    mirror: Arc<PersistenceMirror<S>>,
    palette: Palette,
    itineraries_base: String,
}

impl<S: DraftStore> TripResolver<S> {
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        mirror: Arc<PersistenceMirror<S>>,
        palette: Palette,
    ) -> Self {
        Self {
            cloud: None,
            fetcher,
            mirror,
            palette,
            itineraries_base: String::new(),
        }
    }

    pub fn with_cloud(mut self, service: Arc<dyn CloudTripService>) -> Self {
        self.cloud = Some(service);
        self
    }

    pub fn with_itineraries_base(mut self, base: impl Into<String>) -> Self {
        self.itineraries_base = base.into();
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn itineraries_base(&self) -> &str {
        &self.itineraries_base
    }

    /// Resolve the trip for `address`.
    #[instrument(skip(self, address), fields(address = %address))]
    pub async fn resolve(&self, address: &Address) -> Resolution {
        let refs = address.references();

        for tier in TIERS {
            match self.try_tier(tier, address, &refs).await {
                Outcome::Skip => continue,
                Outcome::Loaded(loaded) => {
                    log::info!(
                        "Loaded trip from {:?} (view only: {})",
                        loaded.mode,
                        loaded.view_only
                    );
                    return Resolution::Loaded(loaded);
                }
                Outcome::Failed(error) => {
                    log::warn!("{:?} source failed: {}", tier, error);
                    return Resolution::Onboarding { error: Some(error) };
                }
            }
        }

        log::info!("No trip source found, showing onboarding");
        Resolution::Onboarding { error: None }
    }

    async fn try_tier(&self, tier: Tier, address: &Address, refs: &References) -> Outcome {
        match tier {
            Tier::Cloud => match &refs.cloud {
                Some(reference) => self.from_cloud(reference, refs.view_only).await,
                None => Outcome::Skip,
            },
            Tier::External => match &refs.external {
                Some(reference) => self.from_external(address.url(), reference).await,
                None => Outcome::Skip,
            },
            Tier::Embedded => match &refs.embedded {
                Some(token) => self.from_token(token, refs.view_only),
                None => Outcome::Skip,
            },
            Tier::Local => match self.mirror.load().await {
                Some(trip) => Outcome::Loaded(LoadedTrip::new(trip, SourceMode::Local, refs.view_only)),
                None => Outcome::Skip,
            },
        }
    }

    async fn from_cloud(&self, reference: &CloudRef, view_flag: bool) -> Outcome {
        let Some(service) = &self.cloud else {
            return Outcome::Failed(ResolveError::CloudUnavailable);
        };

        let row = match fetch_row(service.as_ref(), reference).await {
            Ok(Some(row)) => row,
            Ok(None) => return Outcome::Failed(ResolveError::CloudNotFound),
            Err(e) => return Outcome::Failed(e.into()),
        };
        if let Err(e) = check(&row.trip_data) {
            return Outcome::Failed(e.into());
        }

        let view_only = view_flag || reference.forces_view_only();
        let mut loaded = LoadedTrip::new(
            normalize(&row.trip_data, &self.palette),
            SourceMode::Cloud,
            view_only,
        );
        loaded.cloud = Some(reference.clone());
        loaded.cloud_link = Some(CloudLink::from(&row));
        loaded.cloud_id = Some(row.id);
        Outcome::Loaded(loaded)
    }

    async fn from_external(&self, page: &Url, reference: &ExternalRef) -> Outcome {
        let url = match reference {
            ExternalRef::Url(url) => url.clone(),
            ExternalRef::Named(file) => match itinerary_url(page, &self.itineraries_base, file) {
                Some(url) => url.to_string(),
                None => return Outcome::Failed(ResolveError::InvalidSource(file.clone())),
            },
        };

        let value = match self.fetcher.fetch_json(&url).await {
            Ok(value) => value,
            Err(source) => return Outcome::Failed(ResolveError::External { url, source }),
        };
        if let Err(e) = check(&value) {
            return Outcome::Failed(e.into());
        }

        // External documents are never editable in place.
        let mut loaded = LoadedTrip::new(normalize(&value, &self.palette), SourceMode::External, true);
        loaded.source_url = Some(url);
        Outcome::Loaded(loaded)
    }

    fn from_token(&self, token: &str, view_only: bool) -> Outcome {
        match decode_document(token, &self.palette) {
            Some(trip) => Outcome::Loaded(LoadedTrip::new(trip, SourceMode::Embedded, view_only)),
            None => {
                log::warn!("Ignoring undecodable trip token in address");
                Outcome::Skip
            }
        }
    }
}
