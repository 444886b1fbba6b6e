//! HTTP client for the notes API.
//!
//! # Endpoints
//!
//! ```text
//! GET  {base}/messages/nearby?lat=..&lng=..&radius=..   -> { success, data: [row] }
//! POST {base}/messages  { text, latitude, longitude }   -> { success, data: row }
//! GET  {base}/health                                    -> { success }
//! ```
//!
//! Rows are `{ id, text, latitude, longitude, timestamp }` with `timestamp`
//! in Unix milliseconds. The server's `distanceFromUser` is ignored; user
//! distances are computed locally. A 400 response carries validation
//! messages and maps to [`StoreError::Validation`]. Any other failure maps to
//! [`StoreError::Unavailable`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{BoxFuture, NotePublisher, ProximityStore, StoreError, WireValidationError};
use crate::geo::Coordinate;
use crate::note::{Note, NoteDraft};

/// Default API base URL.
pub const DEFAULT_STORE_URL: &str = "http://localhost:3000/api";

/// Default request timeout.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpStoreConfig {
    /// API base URL without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORE_URL.to_string(),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl HttpStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
    message: Option<String>,
    #[serde(default)]
    messages: Vec<String>,
}

impl<T> Envelope<T> {
    fn failure_reason(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "API request failed".to_string())
    }
}

/// A note as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteRow {
    id: serde_json::Value,
    text: String,
    latitude: f64,
    longitude: f64,
    timestamp: i64,
}

impl NoteRow {
    fn into_note(self) -> Result<Note, StoreError> {
        let id = match self.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let created_at: DateTime<Utc> = DateTime::from_timestamp_millis(self.timestamp)
            .ok_or_else(|| {
                StoreError::unavailable(format!("invalid timestamp {}", self.timestamp))
            })?;
        Ok(Note::new(
            id,
            self.text,
            Coordinate::new(self.latitude, self.longitude),
            created_at,
        ))
    }
}

#[derive(Debug, Serialize)]
struct CreateNoteBody<'a> {
    text: &'a str,
    latitude: f64,
    longitude: f64,
}

/// Note store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    config: HttpStoreConfig,
}

impl HttpStore {
    /// Build a client for the given API.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    /// Probe the health endpoint. Any failure counts as unhealthy.
    pub async fn health(&self) -> bool {
        let url = self.config.endpoint("/health");
        match self.client.get(&url).send().await {
            Ok(response) => response
                .json::<Envelope<serde_json::Value>>()
                .await
                .map(|e| e.success)
                .unwrap_or(false),
            Err(e) => {
                tracing::debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    async fn nearby(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Note>, StoreError> {
        let url = self.config.endpoint("/messages/nearby");
        let query = nearby_params(center, radius_km);

        tracing::debug!(%url, lat = center.latitude, lng = center.longitude, radius_km, "Querying nearby notes");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let rows: Vec<NoteRow> = read_envelope(response).await?;
        rows.into_iter().map(NoteRow::into_note).collect()
    }

    async fn create(&self, draft: NoteDraft) -> Result<Note, StoreError> {
        let url = self.config.endpoint("/messages");
        let location = draft.location();
        let body = CreateNoteBody {
            text: draft.text(),
            latitude: location.latitude,
            longitude: location.longitude,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let row: NoteRow = read_envelope(response).await?;
        row.into_note()
    }
}

impl ProximityStore for HttpStore {
    fn find_within(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<Note>, StoreError>> {
        Box::pin(self.nearby(center, radius_km))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

impl NotePublisher for HttpStore {
    fn publish(&self, draft: NoteDraft) -> BoxFuture<'_, Result<Note, StoreError>> {
        Box::pin(self.create(draft))
    }
}

fn nearby_params(center: Coordinate, radius_km: f64) -> [(&'static str, String); 3] {
    [
        ("lat", center.latitude.to_string()),
        ("lng", center.longitude.to_string()),
        ("radius", radius_km.to_string()),
    ]
}

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::unavailable(e.to_string())
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
    let status = response.status();
    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| StoreError::unavailable(format!("HTTP {}: {}", status, e)))?;
    unwrap_envelope(status, envelope)
}

fn unwrap_envelope<T>(status: StatusCode, envelope: Envelope<T>) -> Result<T, StoreError> {
    if status == StatusCode::BAD_REQUEST {
        let messages = if envelope.messages.is_empty() {
            vec![envelope.failure_reason()]
        } else {
            envelope.messages
        };
        return Err(WireValidationError(messages).into());
    }

    if !status.is_success() || !envelope.success {
        return Err(StoreError::unavailable(format!(
            "HTTP {}: {}",
            status,
            envelope.failure_reason()
        )));
    }

    envelope
        .data
        .ok_or_else(|| StoreError::unavailable("response missing data"))
}
