//! Trip Session
//!
//! The application shell. Holds the single active document and routes every
//! change through the normalizer and then the mirror. Everything else in
//! `core` is a stateless transform called from here.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::AppConfig;
use crate::core::address::{Address, AddressBar, CloudRef, CLOUD_SLUG_KEY};
use crate::core::mirror::{
    build_cloud_link, build_shareable_link, CloudLink, DebouncedMirror, LinkOptions, MirrorStatus,
    PersistenceMirror,
};
use crate::core::remote::{save_trip, CloudError, CloudTripService, SaveOptions, TripRow};
use crate::core::resolver::{LoadedTrip, Resolution, ResolveError, SourceMode, TripResolver};
use crate::core::storage::DraftStore;
use crate::core::trip::{import_json, normalize, templates, ImportError, TripDocument};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("This trip is view-only")]
    ViewOnly,

    #[error("No trip is loaded")]
    NoTrip,

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Cloud save failed: {0}")]
    Cloud(#[from] CloudError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

pub struct TripSession<S> {
    resolver: TripResolver<S>,
    writer: DebouncedMirror,
    mirror: Arc<PersistenceMirror<S>>,
    bar: AddressBar,
    current: Option<LoadedTrip>,
}

impl<S: DraftStore + 'static> TripSession<S> {
    pub fn new(
        resolver: TripResolver<S>,
        mirror: Arc<PersistenceMirror<S>>,
        address: Address,
        debounce: Duration,
    ) -> Self {
        let writer = DebouncedMirror::spawn(mirror.clone(), debounce);
        Self {
            resolver,
            writer,
            mirror,
            bar: AddressBar::new(address),
            current: None,
        }
    }

    /// Session using the configured mirror quiet period.
    pub fn from_config(
        resolver: TripResolver<S>,
        mirror: Arc<PersistenceMirror<S>>,
        address: Address,
        config: &AppConfig,
    ) -> Self {
        let debounce = Duration::from_millis(config.mirror.debounce_ms);
        Self::new(resolver, mirror, address, debounce)
    }

    /// Resolve the trip for the current address. Returns the error that
    /// sent the session to onboarding, if any.
    pub async fn start(&mut self) -> Option<ResolveError> {
        match self.resolver.resolve(self.bar.current()).await {
            Resolution::Loaded(loaded) => {
                self.current = Some(loaded);
                None
            }
            Resolution::Onboarding { error } => {
                self.current = None;
                error
            }
        }
    }

    pub fn needs_onboarding(&self) -> bool {
        self.current.is_none()
    }

    pub fn trip(&self) -> Option<&TripDocument> {
        self.current.as_ref().map(|loaded| &loaded.trip)
    }

    pub fn loaded(&self) -> Option<&LoadedTrip> {
        self.current.as_ref()
    }

    pub fn view_only(&self) -> bool {
        self.current.as_ref().is_some_and(|loaded| loaded.view_only)
    }

    pub fn address(&self) -> &Address {
        self.bar.current()
    }

    pub fn address_bar(&self) -> &AddressBar {
        &self.bar
    }

    pub fn mirror_status(&self) -> MirrorStatus {
        self.writer.status()
    }

    // ========================================================================
    // Onboarding
    // ========================================================================

    pub fn start_from_template(&mut self, name: &str) -> Result<&TripDocument> {
        let trip = templates::builtin(name, self.resolver.palette())
            .ok_or_else(|| SessionError::UnknownTemplate(name.to_string()))?;
        self.replace(trip)
    }

    pub fn start_blank(&mut self, year: i32, month: u32) -> Result<&TripDocument> {
        let mut trip = TripDocument::blank(year, month);
        trip.palette = self.resolver.palette().clone();
        self.replace(trip)
    }

    /// Load user-supplied JSON text as a new editable trip.
    pub fn import_json(&mut self, text: &str) -> Result<&TripDocument> {
        let trip = import_json(text, self.resolver.palette())?;
        self.replace(trip)
    }

    fn replace(&mut self, trip: TripDocument) -> Result<&TripDocument> {
        self.current = Some(LoadedTrip {
            trip,
            mode: SourceMode::Local,
            view_only: false,
            source_url: None,
            cloud: None,
            cloud_id: None,
            cloud_link: None,
        });
        self.mirror_current()
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Apply `change` to a copy of the trip, normalize it, then mirror it.
    pub fn edit<F>(&mut self, change: F) -> Result<&TripDocument>
    where
        F: FnOnce(&mut TripDocument),
    {
        let loaded = self.current.as_mut().ok_or(SessionError::NoTrip)?;
        if loaded.view_only {
            return Err(SessionError::ViewOnly);
        }

        let mut next = loaded.trip.clone();
        change(&mut next);
        loaded.trip = normalize(&next.to_value(), self.resolver.palette());
        self.mirror_current()
    }

    fn mirror_current(&mut self) -> Result<&TripDocument> {
        let loaded = self.current.as_ref().ok_or(SessionError::NoTrip)?;
        if !self.mirror.update_address(&mut self.bar, &loaded.trip) {
            log::warn!("Trip could not be encoded; address left unchanged");
        }
        self.writer.schedule(loaded.trip.clone());
        Ok(&loaded.trip)
    }

    /// Drop the trip, the stored draft and the address fragment.
    pub async fn reset(&mut self) -> Result<bool> {
        if self.view_only() {
            return Err(SessionError::ViewOnly);
        }
        let cleared = self.writer.clear().await;
        self.bar.set_fragment(None);
        self.current = None;
        log::info!("Session reset");
        Ok(cleared)
    }

    /// Write any pending draft now.
    pub async fn flush(&self) -> bool {
        self.writer.flush().await
    }

    pub async fn shutdown(self) {
        self.writer.shutdown().await;
    }

    // ========================================================================
    // Sharing
    // ========================================================================

    /// Link to the current trip. Cloud trips link to their row; everything
    /// else links to its source or embeds the document.
    pub fn share_link(&self) -> Option<String> {
        let loaded = self.current.as_ref()?;
        if loaded.cloud_link.is_some() {
            return self.cloud_link(loaded.view_only);
        }
        let options = LinkOptions {
            source_url: loaded.source_url.clone(),
            view_only: loaded.view_only,
            itineraries_base: self.resolver.itineraries_base().to_string(),
        };
        build_shareable_link(&self.bar.current().base(), &loaded.trip, &options)
    }

    /// Link to the cloud row the trip was loaded from or saved to.
    pub fn cloud_link(&self, view_only: bool) -> Option<String> {
        let row = self.current.as_ref()?.cloud_link.as_ref()?;
        Some(build_cloud_link(&self.bar.current().base(), row, view_only))
    }

    /// Save to the cloud, updating the row this trip came from when known.
    /// A new row moves the address to its slug.
    pub async fn save_to_cloud(
        &mut self,
        service: &dyn CloudTripService,
        options: &SaveOptions,
    ) -> Result<TripRow> {
        let loaded = self.current.as_mut().ok_or(SessionError::NoTrip)?;
        if loaded.view_only {
            return Err(SessionError::ViewOnly);
        }

        let row = save_trip(service, &loaded.trip, loaded.cloud_id.as_deref(), options).await?;
        if loaded.cloud_id.is_none() {
            self.bar
                .set_fragment(Some(&format!("{CLOUD_SLUG_KEY}={}", row.slug)));
        }
        loaded.mode = SourceMode::Cloud;
        loaded.cloud_id = Some(row.id.clone());
        loaded.cloud = Some(CloudRef::Slug(row.slug.clone()));
        loaded.cloud_link = Some(CloudLink::from(&row));
        Ok(row)
    }
}
