use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Search Criteria
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }

    pub fn as_str(self) -> &'static str {
        match self {
            YesNo::Yes => "yes",
            YesNo::No => "no",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(YesNo::Yes),
            "no" => Some(YesNo::No),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cabin {
    #[default]
    Economy,
    #[serde(alias = "premium_economy")]
    Premium,
    Business,
    First,
}

impl Cabin {
    /// Google Flights `travel_class` parameter.
    pub fn travel_class(self) -> u8 {
        match self {
            Cabin::Economy => 1,
            Cabin::Premium => 2,
            Cabin::Business => 3,
            Cabin::First => 4,
        }
    }

    /// Field prefix used by Seats.aero availability records.
    pub fn availability_prefix(self) -> char {
        match self {
            Cabin::Economy => 'Y',
            Cabin::Premium => 'W',
            Cabin::Business => 'J',
            Cabin::First => 'F',
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "economy" => Some(Cabin::Economy),
            "premium" | "premium_economy" => Some(Cabin::Premium),
            "business" => Some(Cabin::Business),
            "first" => Some(Cabin::First),
            _ => None,
        }
    }
}

impl fmt::Display for Cabin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cabin::Economy => "economy",
            Cabin::Premium => "premium",
            Cabin::Business => "business",
            Cabin::First => "first",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    #[default]
    Exact,
    Flex,
}

/// Search request as posted to `/api/redemption`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub flex_days: u32,
    pub passengers: u32,
    #[serde(default)]
    pub cabin: Cabin,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub mode: DateMode,
    pub direct: YesNo,
    pub multi: YesNo,
    pub positioning: YesNo,
}

impl SearchCriteria {
    /// Rejects criteria that the search endpoint cannot act on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.origin.trim().is_empty() {
            return Err(ValidationError::MissingField("origin"));
        }
        if self.destination.trim().is_empty() {
            return Err(ValidationError::MissingField("destination"));
        }
        if self.passengers == 0 {
            return Err(ValidationError::InvalidPassengers);
        }
        if self.direct.is_yes() && self.multi.is_yes() {
            return Err(ValidationError::ConflictingRouting);
        }
        Ok(())
    }

    /// Number of days searched either side of `date`.
    pub fn window_days(&self) -> u32 {
        match self.mode {
            DateMode::Exact => 0,
            DateMode::Flex => self.flex_days,
        }
    }

    /// Every travel date covered by the search window, ascending.
    pub fn travel_dates(&self) -> Vec<NaiveDate> {
        let window = i64::from(self.window_days());
        (-window..=window)
            .filter_map(|offset| self.date.checked_add_signed(chrono::Duration::days(offset)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Required field missing: {0}")]
    MissingField(&'static str),
    #[error("At least one passenger is required")]
    InvalidPassengers,
    #[error("Direct-only and multi-connection cannot both be selected")]
    ConflictingRouting,
    #[error("Routing option not chosen: {0}")]
    UnansweredToggle(&'static str),
}

// ============================================================================
// Search Results
// ============================================================================

/// A single award availability row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub date: NaiveDate,
    pub origin_airport: String,
    pub destination_airport: String,
    pub source: String,
    pub mileage_cost: i64,
    pub taxes_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seats: Option<i64>,
    /// Indicative cash fare in USD for the same route and day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_value: Option<f64>,
    /// Cents of cash fare saved per mile redeemed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_cpm: Option<f64>,
}

impl Offer {
    pub fn taxes_usd(&self) -> f64 {
        self.taxes_cents as f64 / 100.0
    }

    /// `(cash - taxes) / miles * 100`, when both cash and miles are positive.
    pub fn compute_cash_cpm(&self) -> Option<f64> {
        let cash = self.cash_value?;
        if self.mileage_cost <= 0 || cash <= 0.0 {
            return None;
        }
        Some((cash - self.taxes_usd()) / self.mileage_cost as f64 * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub results: Vec<Offer>,
}
