//! Clients for our own web service, used by the wizard and the results page.

use async_trait::async_trait;
use concierge_core::console::{PageLoadError, PageSource};
use concierge_core::{
    AirportRecord, AirportSource, DirectoryLoadError, Offer, ResultsLoadError, ResultsSource, SearchCollaborator,
    SearchCriteria, SearchResult, SearchTransportError,
};
use serde::Deserialize;
use tracing::debug;

fn base(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}

/// Posts criteria to `POST /api/redemption`.
#[derive(Clone)]
pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSearchClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base(base_url) }
    }
}

#[async_trait]
impl SearchCollaborator for HttpSearchClient {
    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResult, SearchTransportError> {
        let response = self
            .http
            .post(format!("{}/api/redemption", self.base_url))
            .json(criteria)
            .send()
            .await
            .map_err(|e| SearchTransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchTransportError::Status(status.as_u16()));
        }
        response
            .json::<SearchResult>()
            .await
            .map_err(|e| SearchTransportError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct StoredResults {
    #[serde(default)]
    results: Vec<Offer>,
}

/// Reads stored result sets from `GET /api/redemption/{session_id}`.
#[derive(Clone)]
pub struct HttpResultsSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpResultsSource {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base(base_url) }
    }
}

#[async_trait]
impl ResultsSource for HttpResultsSource {
    async fn fetch(&self, session_id: &str) -> Result<Vec<Offer>, ResultsLoadError> {
        let id: String = url::form_urlencoded::byte_serialize(session_id.as_bytes()).collect();
        let response = self
            .http
            .get(format!("{}/api/redemption/{}", self.base_url, id))
            .send()
            .await
            .map_err(|e| ResultsLoadError::Network(e.to_string()))?;

        match response.status() {
            s if s.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => return Err(ResultsLoadError::NotFound(session_id.to_string())),
            s => return Err(ResultsLoadError::Status(s.as_u16())),
        }
        let stored: StoredResults = response
            .json()
            .await
            .map_err(|e| ResultsLoadError::Decode(e.to_string()))?;
        Ok(stored.results)
    }
}

/// Fetches the airport list JSON from a fixed url.
#[derive(Clone)]
pub struct HttpAirportSource {
    http: reqwest::Client,
    url: String,
}

impl HttpAirportSource {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

#[async_trait]
impl AirportSource for HttpAirportSource {
    async fn fetch(&self) -> Result<Vec<AirportRecord>, DirectoryLoadError> {
        debug!("Fetching airport list from {}", self.url);
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DirectoryLoadError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryLoadError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| DirectoryLoadError::Parse(e.to_string()))
    }
}

/// Fetches console workspace pages from `/dev/{page}.html`.
#[derive(Clone)]
pub struct HttpPageSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPageSource {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base(base_url) }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, page: &str) -> Result<String, PageLoadError> {
        let response = self
            .http
            .get(format!("{}/dev/{}.html", self.base_url, page))
            .send()
            .await
            .map_err(|e| PageLoadError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PageLoadError::Status(status.as_u16()));
        }
        response.text().await.map_err(|e| PageLoadError::Network(e.to_string()))
    }
}
