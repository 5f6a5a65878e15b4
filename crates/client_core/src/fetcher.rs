//! Network side of a list screen: the [`ListSource`] seam, its reqwest-backed
//! implementation, and [`DataFetcher`], which tags every request with a
//! sequence number so only the newest response is ever applied.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::ApiError;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    config::ClientSettings,
    error::FetchError,
    query::Query,
    render::{ListRow, Page},
};

pub const DEFAULT_LIST_PATH: &str = "/api/v1/auth/all-users";
pub const DEFAULT_COLLECTION_KEY: &str = "users";
const TOTAL_PAGES_KEY: &str = "totalPages";
const CURRENT_PAGE_KEY: &str = "currentPage";

/// Where a list lives and which key of the response body holds its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEndpoint {
    pub path: String,
    pub collection_key: String,
}

impl ListEndpoint {
    pub fn new(path: impl Into<String>, collection_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            collection_key: collection_key.into(),
        }
    }
}

impl Default for ListEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_PATH, DEFAULT_COLLECTION_KEY)
    }
}

#[async_trait]
pub trait ListSource<T>: Send + Sync {
    async fn fetch_page(&self, query: &Query) -> Result<Page<T>, FetchError>;
}

pub struct HttpListSource {
    http: Client,
    server_url: String,
    endpoint: ListEndpoint,
}

impl HttpListSource {
    pub fn new(
        server_url: impl Into<String>,
        endpoint: ListEndpoint,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            endpoint,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        Self::new(
            settings.server_url.clone(),
            settings.list_endpoint(),
            settings.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &ListEndpoint {
        &self.endpoint
    }

    fn url(&self) -> String {
        format!("{}{}", self.server_url, self.endpoint.path)
    }
}

#[async_trait]
impl<T> ListSource<T> for HttpListSource
where
    T: ListRow + DeserializeOwned,
{
    async fn fetch_page(&self, query: &Query) -> Result<Page<T>, FetchError> {
        let response = self
            .http
            .get(self.url())
            .query(&query.to_params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail: ApiError::from_response_body(status.as_u16(), &body),
            });
        }

        let body: Value = response.json().await?;
        decode_page(body, &self.endpoint.collection_key, query.page)
    }
}

/// Normalizes a list response body. A missing collection key or page count is
/// a malformed response; `totalPages: 0` (empty result) becomes 1.
pub fn decode_page<T: DeserializeOwned>(
    mut body: Value,
    collection_key: &str,
    requested_page: u32,
) -> Result<Page<T>, FetchError> {
    let object = body
        .as_object_mut()
        .ok_or_else(|| FetchError::Malformed("expected a JSON object".to_string()))?;

    let items = object
        .get_mut(collection_key)
        .map(Value::take)
        .ok_or_else(|| FetchError::Malformed(format!("missing `{collection_key}` collection")))?;
    let items: Vec<T> = serde_json::from_value(items)
        .map_err(|err| FetchError::Malformed(format!("invalid `{collection_key}` rows: {err}")))?;

    let total_pages = object
        .get(TOTAL_PAGES_KEY)
        .ok_or_else(|| FetchError::Malformed(format!("missing `{TOTAL_PAGES_KEY}`")))?
        .as_u64()
        .ok_or_else(|| {
            FetchError::Malformed(format!("`{TOTAL_PAGES_KEY}` is not a non-negative integer"))
        })?;
    let current_page = object
        .get(CURRENT_PAGE_KEY)
        .and_then(Value::as_u64)
        .map(clamp_page)
        .unwrap_or(requested_page);

    Ok(Page {
        items,
        total_pages: clamp_page(total_pages),
        current_page,
    })
}

fn clamp_page(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX).max(1)
}

/// Monotonic request counter. Only the latest issued number may be applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }

    /// Moves the counter past every issued request so nothing in flight can
    /// still match.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub seq: u64,
    pub result: Result<Page<T>, FetchError>,
}

/// Runs at most one list request at a time. Issuing a new request aborts the
/// previous task, and [`DataFetcher::accept`] rejects anything that still
/// slips through with a stale sequence number.
pub struct DataFetcher<T> {
    source: Arc<dyn ListSource<T>>,
    sequence: RequestSequence,
    in_flight: Option<JoinHandle<()>>,
    outcomes: mpsc::UnboundedSender<FetchOutcome<T>>,
}

impl<T: ListRow> DataFetcher<T> {
    pub fn new(source: Arc<dyn ListSource<T>>) -> (Self, mpsc::UnboundedReceiver<FetchOutcome<T>>) {
        let (outcomes, outcomes_rx) = mpsc::unbounded_channel();
        (
            Self {
                source,
                sequence: RequestSequence::default(),
                in_flight: None,
                outcomes,
            },
            outcomes_rx,
        )
    }

    pub fn issue(&mut self, query: Query) -> u64 {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        let seq = self.sequence.issue();
        debug!(
            seq,
            page = query.page,
            search_term = %query.search_term,
            sort_by = %query.sort_key,
            sort_order = %query.sort_direction,
            "issuing list request"
        );

        let source = Arc::clone(&self.source);
        let outcomes = self.outcomes.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = source.fetch_page(&query).await;
            let _ = outcomes.send(FetchOutcome { seq, result });
        }));
        seq
    }

    /// Unwraps an outcome if it answers the most recent request.
    pub fn accept(&mut self, outcome: FetchOutcome<T>) -> Result<Page<T>, FetchError> {
        if !self.sequence.is_current(outcome.seq) {
            debug!(
                seq = outcome.seq,
                latest = self.sequence.latest(),
                "discarding stale list response"
            );
            return Err(FetchError::Stale {
                seq: outcome.seq,
                latest: self.sequence.latest(),
            });
        }
        self.in_flight = None;
        if let Err(err) = &outcome.result {
            warn!(seq = outcome.seq, error = %err, "list request failed");
        }
        outcome.result
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn latest_seq(&self) -> u64 {
        self.sequence.latest()
    }

    /// Aborts the in-flight request and makes any late result stale.
    pub fn cancel(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.sequence.invalidate();
    }
}

impl<T> Drop for DataFetcher<T> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/fetcher_tests.rs"]
mod tests;
