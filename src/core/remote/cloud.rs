//! Cloud Trip Service
//!
//! Contract for the hosted trip table plus the save path built on it:
//! update-by-id for known rows, insert-with-generated-slug for new ones,
//! with slug collisions retried under a fresh random suffix.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::CloudConfig;
use crate::core::address::CloudRef;
use crate::core::trip::TripDocument;

pub const DEFAULT_MAX_SLUG_ATTEMPTS: usize = 5;
pub const SLUG_SUFFIX_LEN: usize = 6;
pub const SHARE_TOKEN_LEN: usize = 24;
const MAX_SLUG_STEM_LEN: usize = 40;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Cloud storage is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Cloud API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Trip not found: {0}")]
    NotFound(String),

    #[error("Slug already in use: {0}")]
    SlugConflict(String),

    #[error("Could not allocate a unique identifier after {0} attempts")]
    SlugExhausted(usize),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// A stored trip as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRow {
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub share_token: Option<String>,
    pub trip_data: Value,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of an insert. The service assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTripRow {
    pub slug: String,
    pub title: String,
    pub visibility: Visibility,
    pub share_token: String,
    pub trip_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// Body of an update-by-id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateTripRow {
    pub title: String,
    pub visibility: Visibility,
    pub trip_data: Value,
    pub updated_at: DateTime<Utc>,
}

fn id_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

// ============================================================================
// Service Contract
// ============================================================================

/// Hosted trip table. Each lookup returns at most one row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudTripService: Send + Sync {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<TripRow>>;

    async fn fetch_by_slug(&self, slug: &str) -> Result<Option<TripRow>>;

    async fn fetch_by_share_token(&self, token: &str) -> Result<Option<TripRow>>;

    /// Insert a new row; a taken slug is [`CloudError::SlugConflict`].
    async fn insert(&self, row: &NewTripRow) -> Result<TripRow>;

    async fn update(&self, id: &str, changes: &UpdateTripRow) -> Result<TripRow>;
}

/// Look up the row an address refers to.
pub async fn fetch_row(service: &dyn CloudTripService, reference: &CloudRef) -> Result<Option<TripRow>> {
    match reference {
        CloudRef::Id(id) => service.fetch_by_id(id).await,
        CloudRef::Slug(slug) => service.fetch_by_slug(slug).await,
        CloudRef::ShareToken(token) => service.fetch_by_share_token(token).await,
    }
}

// ============================================================================
// Save Path
// ============================================================================

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub visibility: Visibility,
    pub owner_id: Option<String>,
    pub max_slug_attempts: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            visibility: Visibility::Private,
            owner_id: None,
            max_slug_attempts: DEFAULT_MAX_SLUG_ATTEMPTS,
        }
    }
}

impl From<&CloudConfig> for SaveOptions {
    fn from(config: &CloudConfig) -> Self {
        Self {
            max_slug_attempts: config.max_slug_attempts,
            ..Default::default()
        }
    }
}

/// Save a document: update when `existing_id` is known, otherwise insert
/// under a fresh slug.
pub async fn save_trip(
    service: &dyn CloudTripService,
    doc: &TripDocument,
    existing_id: Option<&str>,
    options: &SaveOptions,
) -> Result<TripRow> {
    let title = doc.trip_config.title.trim().to_string();
    let trip_data = serde_json::to_value(doc)?;

    if let Some(id) = existing_id {
        let changes = UpdateTripRow {
            title,
            visibility: options.visibility,
            trip_data,
            updated_at: Utc::now(),
        };
        log::info!("Updating cloud trip {}", id);
        return service.update(id, &changes).await;
    }

    let stem = slugify(&title);
    let share_token = share_token();
    let attempts = options.max_slug_attempts.max(1);

    for attempt in 1..=attempts {
        let row = NewTripRow {
            slug: format!("{}-{}", stem, slug_suffix()),
            title: title.clone(),
            visibility: options.visibility,
            share_token: share_token.clone(),
            trip_data: trip_data.clone(),
            owner_id: options.owner_id.clone(),
        };

        match service.insert(&row).await {
            Ok(saved) => {
                log::info!("Created cloud trip {} ({})", saved.id, saved.slug);
                return Ok(saved);
            }
            Err(CloudError::SlugConflict(slug)) => {
                log::warn!(
                    "Slug {} already taken (attempt {}/{}), retrying",
                    slug,
                    attempt,
                    attempts
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(CloudError::SlugExhausted(attempts))
}

/// Lowercase ASCII slug stem from a title. Accents are folded, other
/// characters collapse to single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_STEM_LEN {
                break;
            }
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "trip".to_string()
    } else {
        slug
    }
}

fn slug_suffix() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..SLUG_SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Random token granting public read access to one row.
pub fn share_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_TOKEN_LEN)
        .map(char::from)
        .collect()
}
