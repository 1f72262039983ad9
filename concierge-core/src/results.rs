use crate::search::Offer;
use crate::submission::{ResultStore, LATEST_RESULTS_KEY, SESSION_QUERY_PARAM};
use async_trait::async_trait;
use std::fmt::Write;
use tracing::{error, info, warn};

pub const RESULT_COLUMNS: usize = 8;
pub const PLACEHOLDER: &str = "—";

const COLUMN_LABELS: [&str; RESULT_COLUMNS] = [
    "Date",
    "Origin",
    "Destination",
    "Airline",
    "Miles Needed",
    "Taxes/Fees",
    "Seats Available",
    "Value (¢/mile)",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultsLoadError {
    #[error("Results request failed: {0}")]
    Network(String),
    #[error("Results endpoint returned HTTP {0}")]
    Status(u16),
    #[error("No results stored for session {0}")]
    NotFound(String),
    #[error("Results response could not be read: {0}")]
    Decode(String),
}

/// Fetches a stored result set by session id.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    async fn fetch(&self, session_id: &str) -> Result<Vec<Offer>, ResultsLoadError>;
}

/// Taxes paid per mile redeemed, in cents. `None` when no miles are charged.
pub fn cost_per_mile(offer: &Offer) -> Option<f64> {
    if offer.mileage_cost <= 0 {
        return None;
    }
    let tax_dollars = offer.taxes_cents as f64 / 100.0;
    Some(tax_dollars * 100.0 / offer.mileage_cost as f64)
}

pub fn format_cost_per_mile(offer: &Offer) -> String {
    cost_per_mile(offer)
        .map(|cpm| format!("{:.2}¢", cpm))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// 60000 -> "60,000"
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Display strings for one table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub date: String,
    pub origin: String,
    pub destination: String,
    pub airline: String,
    pub miles: String,
    pub taxes: String,
    pub seats: String,
    pub value: String,
}

fn or_placeholder(value: &str) -> String {
    if value.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}

impl From<&Offer> for ResultRow {
    fn from(offer: &Offer) -> Self {
        Self {
            date: offer.date.to_string(),
            origin: or_placeholder(&offer.origin_airport),
            destination: or_placeholder(&offer.destination_airport),
            airline: or_placeholder(&offer.source),
            miles: group_thousands(offer.mileage_cost),
            taxes: format!("${:.2}", offer.taxes_usd()),
            seats: offer
                .remaining_seats
                .filter(|s| *s > 0)
                .map(|s| s.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            value: format_cost_per_mile(offer),
        }
    }
}

impl ResultRow {
    fn cells(&self) -> [&str; RESULT_COLUMNS] {
        [
            &self.date,
            &self.origin,
            &self.destination,
            &self.airline,
            &self.miles,
            &self.taxes,
            &self.seats,
            &self.value,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsView {
    Rows(Vec<ResultRow>),
    /// No result set, or an empty one.
    Empty,
    /// The result set could not be fetched.
    Error(String),
}

impl ResultsView {
    pub fn from_offers(offers: &[Offer]) -> Self {
        if offers.is_empty() {
            ResultsView::Empty
        } else {
            ResultsView::Rows(offers.iter().map(ResultRow::from).collect())
        }
    }

    /// Markup for the results `<tbody>`.
    pub fn to_html(&self) -> String {
        match self {
            ResultsView::Rows(rows) => {
                let mut html = String::new();
                for row in rows {
                    html.push_str("<tr>");
                    for (label, cell) in COLUMN_LABELS.iter().zip(row.cells()) {
                        let _ = write!(
                            html,
                            r#"<td data-label="{}">{}</td>"#,
                            html_escape::encode_double_quoted_attribute(label),
                            html_escape::encode_text(cell)
                        );
                    }
                    html.push_str("</tr>");
                }
                html
            }
            ResultsView::Empty => spanning_row("No results found."),
            ResultsView::Error(message) => spanning_row(message),
        }
    }
}

fn spanning_row(message: &str) -> String {
    format!(
        r#"<tr><td colspan="{}" style="text-align:center;">{}</td></tr>"#,
        RESULT_COLUMNS,
        html_escape::encode_text(message)
    )
}

/// Extracts the session id from a page query string (with or without `?`).
pub fn session_id_from_query(query: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == SESSION_QUERY_PARAM)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The results page: resolves its result set once on load.
pub struct ResultsPage;

impl ResultsPage {
    pub async fn load(query: &str, source: &dyn ResultsSource, store: &dyn ResultStore) -> ResultsView {
        let Some(session_id) = session_id_from_query(query) else {
            return Self::from_local_store(store);
        };

        match source.fetch(&session_id).await {
            Ok(offers) => {
                info!("Loaded {} results for session {}", offers.len(), session_id);
                ResultsView::from_offers(&offers)
            }
            Err(e) => {
                error!("Failed to load results for session {}: {}", session_id, e);
                ResultsView::Error("Unable to load results. Please try your search again.".to_string())
            }
        }
    }

    fn from_local_store(store: &dyn ResultStore) -> ResultsView {
        let Some(stored) = store.get_item(LATEST_RESULTS_KEY) else {
            warn!("No session id and no stored results");
            return ResultsView::Empty;
        };
        match serde_json::from_str::<Vec<Offer>>(&stored) {
            Ok(offers) => ResultsView::from_offers(&offers),
            Err(e) => {
                warn!("Stored results are unreadable: {}", e);
                ResultsView::Empty
            }
        }
    }
}
