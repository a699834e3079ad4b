//! Persistence Mirror
//!
//! Best-effort copies of the active trip into the device-local draft store
//! and into the address bar, plus shareable link building. Nothing here
//! returns an error: failures are logged and reported as `false`/`None`.
//!
//! [`DebouncedMirror`] batches rapid edits into one store write after a
//! quiet period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::form_urlencoded;
use url::Url;

use crate::core::address::{
    itinerary_file_name, itinerary_url, AddressBar, CLOUD_SLUG_KEY, SHARE_KEY, SOURCE_KEY,
    TRIP_KEY, VIEW_KEY,
};
use crate::core::remote::TripRow;
use crate::core::storage::DraftStore;
use crate::core::trip::{check, codec, TripDocument};

// ============================================================================
// Mirror
// ============================================================================

/// Mirrors one trip document under a fixed store key.
pub struct PersistenceMirror<S> {
    store: S,
    key: String,
}

impl<S: DraftStore> PersistenceMirror<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrite the stored draft. Returns `false` if encoding or the store
    /// failed.
    pub async fn save(&self, doc: &TripDocument) -> bool {
        let json = match serde_json::to_string(doc) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Could not serialize draft: {}", e);
                return false;
            }
        };
        match self.store.set(&self.key, &json).await {
            Ok(()) => {
                log::debug!("Saved draft ({} bytes)", json.len());
                true
            }
            Err(e) => {
                log::warn!("Could not save draft: {}", e);
                false
            }
        }
    }

    /// The stored draft, if present, parseable and structurally valid.
    pub async fn load(&self) -> Option<TripDocument> {
        let raw = match self.store.get(&self.key).await {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Could not read draft: {}", e);
                return None;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Stored draft is not valid JSON: {}", e);
                return None;
            }
        };
        if let Err(e) = check(&value) {
            log::warn!("Stored draft failed validation: {}", e);
            return None;
        }
        match serde_json::from_value(value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::warn!("Stored draft could not be read: {}", e);
                None
            }
        }
    }

    pub async fn clear(&self) -> bool {
        match self.store.remove(&self.key).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not clear draft: {}", e);
                false
            }
        }
    }

    /// Push `#trip=<token>` for `doc`. Leaves the address alone and returns
    /// `false` when the document cannot be encoded.
    pub fn update_address(&self, bar: &mut AddressBar, doc: &TripDocument) -> bool {
        match codec::encode(doc) {
            Some(token) => {
                bar.set_trip_token(&token);
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Links
// ============================================================================

/// What a shareable link may reference besides the document itself.
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// External URL the document was loaded from.
    pub source_url: Option<String>,
    pub view_only: bool,
    /// Prefix of well-known itineraries, absolute or relative to the page.
    pub itineraries_base: String,
}

/// Link to `doc` from the page at `base`, carrying exactly one trip
/// reference: the shorthand name for a well-known itinerary, else
/// `source=`, else an embedded token. `None` when none can be produced.
pub fn build_shareable_link(base: &Url, doc: &TripDocument, options: &LinkOptions) -> Option<String> {
    let mut fragment = form_urlencoded::Serializer::new(String::new());
    let mut shorthand = None;

    match options.source_url.as_deref() {
        Some(source) => match well_known_name(base, &options.itineraries_base, source) {
            Some(name) => shorthand = Some(name),
            None => {
                fragment.append_pair(SOURCE_KEY, source);
            }
        },
        None => {
            let token = codec::encode(doc)?;
            fragment.append_pair(TRIP_KEY, &token);
        }
    }
    if options.view_only {
        fragment.append_pair(VIEW_KEY, "1");
    }

    let pairs = fragment.finish();
    let fragment = match shorthand {
        Some(name) if pairs.is_empty() => name,
        Some(name) => format!("{name}&{pairs}"),
        None => pairs,
    };
    Some(with_fragment(base, &fragment))
}

/// The parts of a cloud row a link is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudLink {
    pub slug: String,
    pub share_token: Option<String>,
}

impl From<&TripRow> for CloudLink {
    fn from(row: &TripRow) -> Self {
        Self {
            slug: row.slug.clone(),
            share_token: row.share_token.clone(),
        }
    }
}

/// Link to a cloud row: `#share=<token>` for read-only sharing when the row
/// has a token, otherwise `#t=<slug>`.
pub fn build_cloud_link(base: &Url, row: &CloudLink, view_only: bool) -> String {
    let mut fragment = form_urlencoded::Serializer::new(String::new());
    match row.share_token.as_deref() {
        Some(token) if view_only => {
            fragment.append_pair(SHARE_KEY, token);
        }
        _ => {
            fragment.append_pair(CLOUD_SLUG_KEY, &row.slug);
            if view_only {
                fragment.append_pair(VIEW_KEY, "1");
            }
        }
    }
    with_fragment(base, &fragment.finish())
}

fn well_known_name(base: &Url, itineraries_base: &str, source: &str) -> Option<String> {
    if itineraries_base.is_empty() {
        return None;
    }
    let prefix = itinerary_url(base, itineraries_base, "")?;
    let file = source.strip_prefix(prefix.as_str())?;
    let stem = file.strip_suffix(".json")?;
    (itinerary_file_name(stem).as_deref() == Some(file)).then(|| stem.to_string())
}

fn with_fragment(base: &Url, fragment: &str) -> String {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(Some(fragment));
    url.to_string()
}

// ============================================================================
// Debounced Writer
// ============================================================================

/// Debounced mirror status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStatus {
    /// Nothing written yet
    Idle,
    /// A document is waiting out the quiet period
    Pending,
    /// Last write succeeded
    Saved,
    /// Last write failed
    Failed,
}

enum Command {
    Save(Box<TripDocument>),
    Clear(oneshot::Sender<bool>),
    Flush(oneshot::Sender<bool>),
}

/// Handle to a background task that coalesces saves. Only the latest
/// document in a burst is written, once no update arrived for `delay`.
/// Dropping the handle writes anything still pending and stops the task.
pub struct DebouncedMirror {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<MirrorStatus>,
    task: JoinHandle<()>,
}

impl DebouncedMirror {
    pub fn spawn<S>(mirror: Arc<PersistenceMirror<S>>, delay: Duration) -> Self
    where
        S: DraftStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(MirrorStatus::Idle);
        let task = tokio::spawn(run_writer(mirror, delay, rx, status_tx));
        Self { tx, status, task }
    }

    /// Schedule `doc` to be written after the quiet period.
    pub fn schedule(&self, doc: TripDocument) {
        if self.tx.send(Command::Save(Box::new(doc))).is_err() {
            log::warn!("Draft writer has stopped; edit not mirrored");
        }
    }

    /// Write any pending document now. `true` if nothing was pending or the
    /// write succeeded.
    pub async fn flush(&self) -> bool {
        self.request(Command::Flush).await
    }

    /// Drop any pending document and delete the stored draft.
    pub async fn clear(&self) -> bool {
        self.request(Command::Clear).await
    }

    pub fn status(&self) -> MirrorStatus {
        *self.status.borrow()
    }

    /// Flush and wait for the writer task to finish.
    pub async fn shutdown(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            log::warn!("Draft writer ended abnormally: {}", e);
        }
    }

    async fn request(&self, make: impl FnOnce(oneshot::Sender<bool>) -> Command) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(make(ack_tx)).is_err() {
            return false;
        }
        ack_rx.await.unwrap_or(false)
    }
}

async fn run_writer<S: DraftStore>(
    mirror: Arc<PersistenceMirror<S>>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<MirrorStatus>,
) {
    let mut pending: Option<Box<TripDocument>> = None;
    let mut deadline = Instant::now();

    loop {
        let command = if pending.is_some() {
            tokio::select! {
                command = rx.recv() => command,
                _ = tokio::time::sleep_until(deadline) => {
                    write_pending(&mirror, &mut pending, &status).await;
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(Command::Save(doc)) => {
                pending = Some(doc);
                deadline = Instant::now() + delay;
                status.send_replace(MirrorStatus::Pending);
            }
            Some(Command::Flush(ack)) => {
                let ok = write_pending(&mirror, &mut pending, &status).await;
                let _ = ack.send(ok);
            }
            Some(Command::Clear(ack)) => {
                pending = None;
                let ok = mirror.clear().await;
                status.send_replace(MirrorStatus::Idle);
                let _ = ack.send(ok);
            }
            None => {
                write_pending(&mirror, &mut pending, &status).await;
                log::debug!("Draft writer stopped");
                break;
            }
        }
    }
}

async fn write_pending<S: DraftStore>(
    mirror: &PersistenceMirror<S>,
    pending: &mut Option<Box<TripDocument>>,
    status: &watch::Sender<MirrorStatus>,
) -> bool {
    let Some(doc) = pending.take() else {
        return true;
    };
    let ok = mirror.save(&doc).await;
    status.send_replace(if ok {
        MirrorStatus::Saved
    } else {
        MirrorStatus::Failed
    });
    ok
}
