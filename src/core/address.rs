//! Address Grammar
//!
//! Reads trip references out of a page address. The fragment carries
//! `&`-separated `key=value` pairs:
//!
//! - `trip=<token>`    embedded codec token
//! - `source=<url>`    external JSON resource (percent-encoded)
//! - `cloud=<id>`      cloud row by id
//! - `t=<slug>`        cloud row by slug
//! - `share=<token>`   cloud row by public share token (always view-only)
//! - `view=1`          view-only, also honoured in the query string
//!
//! A segment without `=` is shorthand for `<itineraries>/<name>.json`.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;
use url::Url;

pub const TRIP_KEY: &str = "trip";
pub const SOURCE_KEY: &str = "source";
pub const CLOUD_ID_KEY: &str = "cloud";
pub const CLOUD_SLUG_KEY: &str = "t";
pub const SHARE_KEY: &str = "share";
pub const VIEW_KEY: &str = "view";

static BARE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").expect("valid bare-name pattern"));

// ============================================================================
// References
// ============================================================================

/// How a cloud row is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudRef {
    Id(String),
    Slug(String),
    ShareToken(String),
}

impl CloudRef {
    /// Share tokens only ever grant read access.
    pub fn forces_view_only(&self) -> bool {
        matches!(self, CloudRef::ShareToken(_))
    }
}

/// An external JSON resource, either spelled out or named by shorthand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalRef {
    Url(String),
    /// File name under the itineraries prefix, `.json` already applied.
    Named(String),
}

/// Every trip reference present in an address. The resolver decides which
/// one is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub cloud: Option<CloudRef>,
    pub external: Option<ExternalRef>,
    pub embedded: Option<String>,
    pub view_only: bool,
}

// ============================================================================
// Address
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    url: Url,
}

impl Address {
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(input)?,
        })
    }

    pub fn from_url(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Origin and path, without query or fragment.
    pub fn base(&self) -> Url {
        let mut base = self.url.clone();
        base.set_query(None);
        base.set_fragment(None);
        base
    }

    /// Decoded `key=value` pairs from the fragment.
    pub fn fragment_pairs(&self) -> Vec<(String, String)> {
        pairs(self.url.fragment().unwrap_or(""))
    }

    pub fn fragment_value(&self, key: &str) -> Option<String> {
        self.fragment_pairs()
            .into_iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v)
    }

    /// `view=1` in either the fragment or the query string.
    pub fn view_only(&self) -> bool {
        let flagged = |(k, v): &(String, String)| k == VIEW_KEY && v == "1";
        self.fragment_pairs().iter().any(flagged)
            || pairs(self.url.query().unwrap_or("")).iter().any(flagged)
    }

    /// First fragment segment without `=`, if it names a loadable resource.
    pub fn bare_name(&self) -> Option<String> {
        let fragment = self.url.fragment()?;
        let segment = fragment.split('&').find(|s| !s.is_empty() && !s.contains('='))?;
        let decoded = percent_decode(segment);
        match itinerary_file_name(&decoded) {
            Some(file) => Some(file),
            None => {
                log::warn!("Ignoring unsupported itinerary name in address: {}", decoded);
                None
            }
        }
    }

    pub fn references(&self) -> References {
        let cloud = self
            .fragment_value(CLOUD_ID_KEY)
            .map(CloudRef::Id)
            .or_else(|| self.fragment_value(CLOUD_SLUG_KEY).map(CloudRef::Slug))
            .or_else(|| self.fragment_value(SHARE_KEY).map(CloudRef::ShareToken));

        let external = self
            .fragment_value(SOURCE_KEY)
            .map(ExternalRef::Url)
            .or_else(|| self.bare_name().map(ExternalRef::Named));

        References {
            cloud,
            external,
            embedded: self.fragment_value(TRIP_KEY),
            view_only: self.view_only(),
        }
    }

    /// Address with the fragment replaced; `None` removes it.
    pub fn with_fragment(&self, fragment: Option<&str>) -> Self {
        let mut url = self.url.clone();
        url.set_fragment(fragment);
        Self { url }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// File name for a shorthand itinerary name, or `None` if the name is not
/// allowed. A trailing alphabetic component is an extension and must be
/// `json`; otherwise `.json` is appended.
pub fn itinerary_file_name(name: &str) -> Option<String> {
    if !BARE_NAME.is_match(name) || name.contains("..") || name.ends_with('.') {
        return None;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphabetic()) => {
            if ext.eq_ignore_ascii_case("json") && !stem.is_empty() {
                Some(name.to_string())
            } else {
                None
            }
        }
        _ => Some(format!("{name}.json")),
    }
}

/// Absolute URL of an itinerary file under `prefix`, which may be relative
/// to the page.
pub fn itinerary_url(page: &Url, prefix: &str, file: &str) -> Option<Url> {
    let joined = format!("{}/{}", prefix.trim_end_matches('/'), file);
    match Url::parse(&joined) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => page.join(&joined).ok(),
        Err(_) => None,
    }
}

fn pairs(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn percent_decode(raw: &str) -> String {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Address Bar
// ============================================================================

/// Entries kept for [`AddressBar::back`]; older ones are dropped.
pub const MAX_HISTORY: usize = 50;

/// The page address plus its history stack. Updates push a new entry
/// instead of reloading.
#[derive(Debug, Clone)]
pub struct AddressBar {
    current: Address,
    history: VecDeque<Address>,
}

impl AddressBar {
    pub fn new(current: Address) -> Self {
        Self {
            current,
            history: VecDeque::new(),
        }
    }

    pub fn current(&self) -> &Address {
        &self.current
    }

    pub fn push(&mut self, next: Address) {
        if next == self.current {
            return;
        }
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push_back(previous);
        if self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Swap the current entry without recording it in history.
    pub fn replace(&mut self, next: Address) {
        self.current = next;
    }

    pub fn set_fragment(&mut self, fragment: Option<&str>) {
        let next = self.current.with_fragment(fragment);
        self.push(next);
    }

    /// Point the fragment at an embedded document. A fragment that already
    /// holds nothing but a token is rewritten in place, so a run of edits
    /// leaves a single history entry.
    pub fn set_trip_token(&mut self, token: &str) {
        let next = self
            .current
            .with_fragment(Some(&format!("{TRIP_KEY}={token}")));
        let only_token = matches!(
            self.current.fragment_pairs().as_slice(),
            [(key, _)] if key == TRIP_KEY
        );
        if only_token {
            self.replace(next);
        } else {
            self.push(next);
        }
    }

    /// Step back one entry. Returns `false` at the start of history.
    pub fn back(&mut self) -> bool {
        match self.history.pop_back() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
