use chrono::NaiveDate;
use concierge_core::{Offer, SearchCriteria};
use concierge_partners::{AvailabilityRecord, DayQuery, PartnerError};
use concierge_store::FareKey;
use tracing::{debug, info, warn};
use crate::error::AppError;
use crate::state::AppState;

/// Why a single day produced no availability.
enum DayFailure {
    CircuitOpen,
    Partner(PartnerError),
}

async fn fetch_day(state: &AppState, criteria: &SearchCriteria, day: NaiveDate) -> Result<Vec<AvailabilityRecord>, DayFailure> {
    let cb = &state.resiliency.seats_aero;
    if !cb.check().await {
        warn!("Skipping {}: Circuit Breaker [{}] is OPEN", day, cb.name);
        return Err(DayFailure::CircuitOpen);
    }

    let query = DayQuery {
        origin: &criteria.origin,
        destination: &criteria.destination,
        day,
        take: state.search.take,
        direct_only: criteria.direct.is_yes(),
    };
    match state.awards.search_day(&query).await {
        Ok(records) => {
            cb.record_success().await;
            Ok(records)
        }
        Err(e) => {
            cb.record_failure().await;
            warn!("Availability search failed on {}: {}", day, e);
            Err(DayFailure::Partner(e))
        }
    }
}

/// Cash fare for the route on `day`, from cache when possible. Failures only
/// cost the enrichment.
async fn cash_fare(state: &AppState, criteria: &SearchCriteria, day: NaiveDate) -> Option<f64> {
    let key = FareKey {
        origin: criteria.origin.clone(),
        destination: criteria.destination.clone(),
        date: day,
        travel_class: criteria.cabin.travel_class(),
    };

    match state.sessions.cached_fare(&key).await {
        Ok(Some(price)) => return Some(price),
        Ok(None) => {}
        Err(e) => warn!("Fare cache read failed for {}: {}", key, e),
    }

    let cb = &state.resiliency.serpapi;
    if !cb.check().await {
        debug!("Cash fare skipped for {}: circuit open", key);
        return None;
    }

    match state.fares.cash_fare(&key.origin, &key.destination, day, key.travel_class).await {
        Ok(price) => {
            cb.record_success().await;
            if let Some(price) = price {
                if let Err(e) = state.sessions.cache_fare(&key, price, state.search.fare_cache_ttl_seconds).await {
                    warn!("Fare cache write failed for {}: {}", key, e);
                }
            }
            price
        }
        Err(e) => {
            cb.record_failure().await;
            warn!("Cash fare lookup failed for {}: {}", key, e);
            None
        }
    }
}

fn keep_for_party(offer: &Offer, passengers: u32) -> bool {
    !matches!(offer.remaining_seats, Some(seats) if seats < i64::from(passengers))
}

fn keep_for_program(offer: &Offer, program: &str) -> bool {
    let program = program.trim();
    program.is_empty() || offer.source.eq_ignore_ascii_case(program)
}

/// Normalizes one day's availability into offers for the requested cabin.
pub fn offers_for_day(records: &[AvailabilityRecord], criteria: &SearchCriteria) -> Vec<Offer> {
    records
        .iter()
        .filter(|r| r.passes_sanity(criteria.cabin))
        .map(|r| r.to_offer(criteria.cabin, &criteria.origin, &criteria.destination))
        .filter(|o| keep_for_party(o, criteria.passengers))
        .filter(|o| keep_for_program(o, &criteria.program))
        .collect()
}

/// Searches every day in the window. A failing day is skipped; only when no
/// day could be searched at all does the search fail.
pub async fn search(state: &AppState, criteria: &SearchCriteria) -> Result<Vec<Offer>, AppError> {
    let dates = criteria.travel_dates();
    info!(
        "Award search {} -> {} ({} cabin) over {} day(s)",
        criteria.origin,
        criteria.destination,
        criteria.cabin,
        dates.len()
    );

    let mut offers = Vec::new();
    let mut searched_any = false;
    let mut last_failure = None;

    for day in dates {
        let records = match fetch_day(state, criteria, day).await {
            Ok(records) => records,
            Err(failure) => {
                last_failure = Some(failure);
                continue;
            }
        };
        searched_any = true;

        let mut day_offers = offers_for_day(&records, criteria);
        if day_offers.is_empty() {
            continue;
        }

        let cash = cash_fare(state, criteria, day).await;
        for offer in &mut day_offers {
            offer.cash_value = cash;
            offer.cash_cpm = offer.compute_cash_cpm();
        }
        offers.extend(day_offers);
    }

    if !searched_any {
        if let Some(failure) = last_failure {
            return Err(match failure {
                DayFailure::CircuitOpen => AppError::ServiceUnavailable("Award search is temporarily unavailable.".into()),
                DayFailure::Partner(e) => AppError::upstream("search_failed")(e),
            });
        }
    }

    info!("Award search found {} offers", offers.len());
    Ok(offers)
}
