pub mod duffel;
pub mod error;
pub mod firestore;
pub mod plaid;
pub mod seats_aero;
pub mod serpapi;
pub mod site;

use std::time::Duration;

pub use duffel::{DuffelApi, DuffelClient};
pub use error::{PartnerError, PartnerResult};
pub use firestore::{FirestoreClient, ServiceAccount};
pub use plaid::{PlaidApi, PlaidClient};
pub use seats_aero::{AvailabilityRecord, AwardAvailability, BulkQuery, DayQuery, SeatsAeroClient};
pub use serpapi::{CashFareSource, SerpApiClient};
pub use site::{HttpAirportSource, HttpPageSource, HttpResultsSource, HttpSearchClient};

/// Shared outbound client; every partner request inherits `timeout`.
pub fn http_client(timeout: Duration) -> PartnerResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("conciergesync/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Reads the body of a non-success response into a `PartnerError::Status`.
pub(crate) async fn ensure_success(partner: &'static str, response: reqwest::Response) -> PartnerResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!("{} returned HTTP {}: {}", partner, status.as_u16(), body);
    Err(PartnerError::Status {
        partner,
        code: status.as_u16(),
        body,
    })
}
