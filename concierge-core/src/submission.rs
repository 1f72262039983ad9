use crate::search::{SearchCriteria, SearchResult, ValidationError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const LATEST_RESULTS_KEY: &str = "conciergesync:latestRedemptionResults";
pub const LAST_SESSION_KEY: &str = "conciergesync:lastSessionId";
pub const RESULTS_PAGE: &str = "/dev/redemption-results.html";
pub const SESSION_QUERY_PARAM: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchTransportError {
    #[error("Search request failed: {0}")]
    Network(String),
    #[error("Search endpoint returned HTTP {0}")]
    Status(u16),
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),
    #[error("Search response could not be read: {0}")]
    Decode(String),
}

/// The remote search endpoint.
#[async_trait]
pub trait SearchCollaborator: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResult, SearchTransportError>;
}

/// Browser-local key/value storage. Values are plain JSON strings.
pub trait ResultStore: Send + Sync {
    fn set_item(&self, key: &str, value: String);
    fn get_item(&self, key: &str) -> Option<String>;
}

/// What the user is told when a search cannot complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub message: String,
    pub cause: SearchTransportError,
}

impl From<SearchTransportError> for SearchFailure {
    fn from(cause: SearchTransportError) -> Self {
        Self {
            message: "Search failed. Please check your details and try again.".to_string(),
            cause,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Results stored; go to this same-origin path.
    Navigate(String),
    /// Show a blocking alert and leave the form as it is.
    Alert(SearchFailure),
    /// A submission was already in flight; nothing was sent.
    Ignored,
}

/// Path of the results page, carrying the session id when there is one.
pub fn results_url(session_id: Option<&str>) -> String {
    match session_id {
        Some(id) if !id.is_empty() => {
            let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
            format!("{}?{}={}", RESULTS_PAGE, SESSION_QUERY_PARAM, encoded)
        }
        _ => RESULTS_PAGE.to_string(),
    }
}

/// Posts search criteria, stores the outcome and decides where to go next.
/// Only one submission may be in flight at a time.
pub struct SearchFlow {
    collaborator: Arc<dyn SearchCollaborator>,
    store: Arc<dyn ResultStore>,
    in_flight: AtomicBool,
    timeout: Duration,
}

impl SearchFlow {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(collaborator: Arc<dyn SearchCollaborator>, store: Arc<dyn ResultStore>) -> Self {
        Self {
            collaborator,
            store,
            in_flight: AtomicBool::new(false),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn submit(&self, criteria: &SearchCriteria) -> Result<SubmitOutcome, ValidationError> {
        criteria.validate()?;

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Search already in flight, ignoring submit");
            return Ok(SubmitOutcome::Ignored);
        };

        info!(
            "Submitting redemption search {} -> {} on {}",
            criteria.origin, criteria.destination, criteria.date
        );

        let response = tokio::time::timeout(self.timeout, self.collaborator.search(criteria)).await;
        let outcome = match response {
            Ok(Ok(result)) => self.persist(result),
            Ok(Err(e)) => {
                warn!("Redemption search failed: {}", e);
                SubmitOutcome::Alert(e.into())
            }
            Err(_) => {
                warn!("Redemption search timed out after {:?}", self.timeout);
                SubmitOutcome::Alert(SearchTransportError::Timeout(self.timeout).into())
            }
        };

        Ok(outcome)
    }

    fn persist(&self, result: SearchResult) -> SubmitOutcome {
        let json = match serde_json::to_string(&result.results) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize search results: {}", e);
                return SubmitOutcome::Alert(SearchTransportError::Decode(e.to_string()).into());
            }
        };

        self.store.set_item(LATEST_RESULTS_KEY, json);
        if let Some(session_id) = &result.session_id {
            self.store.set_item(LAST_SESSION_KEY, session_id.clone());
        }

        info!("Stored {} redemption results", result.results.len());
        SubmitOutcome::Navigate(results_url(result.session_id.as_deref()))
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
