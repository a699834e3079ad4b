//! REST Trip Service
//!
//! [`CloudTripService`] over a PostgREST-style table endpoint:
//! `GET /rest/v1/<table>?<column>=eq.<value>`, `POST` for inserts and
//! `PATCH ?id=eq.<id>` for updates, both returning the stored row.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::instrument;

use super::cloud::{CloudError, CloudTripService, NewTripRow, Result, TripRow, UpdateTripRow};
use crate::config::CloudConfig;

const REST_PATH: &str = "rest/v1";

pub struct RestTripService {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestTripService {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: table.into(),
        })
    }

    /// Build from configuration; `None` when no endpoint is configured.
    pub fn from_config(config: &CloudConfig) -> Result<Option<Self>> {
        match (&config.base_url, &config.api_key) {
            (Some(url), Some(key)) if !url.is_empty() => {
                Ok(Some(Self::new(url.clone(), key.clone(), config.table.clone())?))
            }
            _ => Ok(None),
        }
    }

    /// Like [`Self::from_config`], for callers that cannot continue without
    /// the cloud.
    pub fn require(config: &CloudConfig) -> Result<Self> {
        Self::from_config(config)?.ok_or(CloudError::NotConfigured)
    }

    fn rows_url(&self) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), REST_PATH, self.table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
    }

    #[instrument(skip(self))]
    async fn fetch_one(&self, column: &str, value: &str) -> Result<Option<TripRow>> {
        let filter = format!("eq.{value}");
        let resp = self
            .authorized(self.client.get(self.rows_url()))
            .query(&[(column, filter.as_str()), ("select", "*"), ("limit", "1")])
            .send()
            .await?;

        let rows: Vec<TripRow> = Self::rows(resp).await?;
        Ok(rows.into_iter().next())
    }

    async fn rows(resp: Response) -> Result<Vec<TripRow>> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CloudError::Api {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<Vec<TripRow>>()
            .await
            .map_err(|e| CloudError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CloudTripService for RestTripService {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<TripRow>> {
        self.fetch_one("id", id).await
    }

    async fn fetch_by_slug(&self, slug: &str) -> Result<Option<TripRow>> {
        self.fetch_one("slug", slug).await
    }

    async fn fetch_by_share_token(&self, token: &str) -> Result<Option<TripRow>> {
        self.fetch_one("share_token", token).await
    }

    async fn insert(&self, row: &NewTripRow) -> Result<TripRow> {
        let resp = self
            .authorized(self.client.post(self.rows_url()))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(CloudError::SlugConflict(row.slug.clone()));
        }

        Self::rows(resp)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::InvalidResponse("insert returned no row".to_string()))
    }

    async fn update(&self, id: &str, changes: &UpdateTripRow) -> Result<TripRow> {
        let filter = format!("eq.{id}");
        let resp = self
            .authorized(self.client.patch(self.rows_url()))
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(changes)
            .send()
            .await?;

        Self::rows(resp)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::NotFound(id.to_string()))
    }
}
