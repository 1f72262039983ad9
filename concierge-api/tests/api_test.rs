use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use concierge_api::{app, middleware::Resiliency, AppState};
use concierge_core::{
    submission::{LAST_SESSION_KEY, LATEST_RESULTS_KEY},
    Cabin, DateMode, ResultStore, SearchCollaborator, SearchCriteria, SearchFlow, SearchResult, SearchTransportError,
    SubmitOutcome, YesNo,
};
use concierge_partners::{
    plaid::TokenExchange, AvailabilityRecord, AwardAvailability, BulkQuery, CashFareSource, DayQuery, DuffelApi, PartnerError,
    PartnerResult, PlaidApi,
};
use concierge_store::app_config::{RateLimitConfig, SearchConfig};
use concierge_store::{LocalStore, MemoryStore};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Fakes
// ============================================================================

/// Business-class availability on every day except `failing_day`.
#[derive(Default)]
struct FakeAwards {
    calls: AtomicUsize,
    failing_day: Option<NaiveDate>,
    always_fail: bool,
}

#[async_trait]
impl AwardAvailability for FakeAwards {
    async fn search_day(&self, query: &DayQuery<'_>) -> PartnerResult<Vec<AvailabilityRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail || Some(query.day) == self.failing_day {
            return Err(PartnerError::Status { partner: "seats.aero", code: 500, body: String::new() });
        }
        let record = serde_json::from_value(json!({
            "Date": query.day,
            "Source": "american",
            "Route": { "OriginAirport": query.origin, "DestinationAirport": query.destination },
            "JMileageCost": "57000",
            "JTotalTaxes": 8760,
            "JRemainingSeats": 4,
            "YMileageCost": "0"
        }))
        .map_err(PartnerError::from)?;
        Ok(vec![record])
    }

    async fn bulk_availability(&self, query: &BulkQuery<'_>) -> PartnerResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "data": [], "sources": query.source, "region": query.region, "month": query.month }))
    }
}

#[derive(Default)]
struct FakeFares {
    calls: AtomicUsize,
}

#[async_trait]
impl CashFareSource for FakeFares {
    async fn cash_fare(&self, _o: &str, _d: &str, _date: NaiveDate, travel_class: u8) -> PartnerResult<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(travel_class, 3);
        Ok(Some(657.6))
    }
}

struct FakePlaid;

#[async_trait]
impl PlaidApi for FakePlaid {
    async fn create_link_token(&self, client_user_id: &str) -> PartnerResult<Value> {
        Ok(json!({ "link_token": format!("link-{}", client_user_id) }))
    }

    async fn exchange_public_token(&self, public_token: &str) -> PartnerResult<TokenExchange> {
        let raw = match public_token {
            "public-good" => json!({ "item_id": "item-1", "access_token": "access-1" }),
            _ => json!({ "error_code": "INVALID_PUBLIC_TOKEN" }),
        };
        Ok(serde_json::from_value(raw)?)
    }

    async fn accounts(&self, access_token: &str) -> PartnerResult<Value> {
        Ok(json!({ "accounts": [], "token": access_token }))
    }
}

#[derive(Default)]
struct FakeDuffel {
    calls: AtomicUsize,
}

#[async_trait]
impl DuffelApi for FakeDuffel {
    async fn create_offer_request(&self, _body: &Value) -> PartnerResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PartnerError::Status { partner: "duffel", code: 500, body: "boom".into() })
    }
}

struct Harness {
    awards: Arc<FakeAwards>,
    fares: Arc<FakeFares>,
    duffel: Arc<FakeDuffel>,
    state: AppState,
}

impl Harness {
    /// Breakers open on the first failure.
    fn new(awards: FakeAwards) -> Self {
        Self::with_limits(awards, 1_000, 1, PathBuf::from("dev"))
    }

    fn tolerant(awards: FakeAwards) -> Self {
        Self::with_limits(awards, 1_000, 5, PathBuf::from("dev"))
    }

    fn with_limits(awards: FakeAwards, requests: i64, failure_threshold: usize, static_dir: PathBuf) -> Self {
        let awards = Arc::new(awards);
        let fares = Arc::new(FakeFares::default());
        let duffel = Arc::new(FakeDuffel::default());
        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            sessions: store.clone(),
            plaid_items: store,
            awards: awards.clone(),
            fares: fares.clone(),
            plaid: Arc::new(FakePlaid),
            duffel: duffel.clone(),
            resiliency: Arc::new(Resiliency::new(failure_threshold, Duration::from_secs(60))),
            search: SearchConfig {
                session_ttl_seconds: 3600,
                fare_cache_ttl_seconds: 3600,
                take: 40,
                max_flex_days: 7,
            },
            rate_limit: RateLimitConfig { requests, window_seconds: 60 },
            static_dir,
        };
        Self { awards, fares, duffel, state }
    }

    fn router(&self) -> Router {
        app(self.state.clone())
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, d).unwrap()
}

// ============================================================================
// Redemption search
// ============================================================================

#[tokio::test]
async fn test_liveness() {
    let h = Harness::new(FakeAwards::default());
    let (status, body) = send(h.router(), get("/api/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_missing_destination_is_rejected() {
    let h = Harness::new(FakeAwards::default());
    let (status, body) = send(h.router(), post_json("/api/redemption", json!({ "origin": "DFW" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_parameters");
    assert_eq!(h.awards.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_flex_search_skips_failing_day_and_stores_session() {
    let h = Harness::tolerant(FakeAwards { failing_day: Some(day(6)), ..Default::default() });
    let request = json!({
        "origin": "DFW", "destination": "LHR", "date": "2025-12-05",
        "mode": "flex", "flexDays": 1, "passengers": 2, "cabin": "business",
        "program": "", "direct": "no", "multi": "no", "positioning": "no"
    });

    let (status, body) = send(h.router(), post_json("/api/redemption", request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.awards.calls.load(Ordering::SeqCst), 3);

    let results = body["results"].as_array().unwrap();
    let dates: Vec<&str> = results.iter().map(|r| r["date"].as_str().unwrap()).collect();
    assert_eq!(dates, vec!["2025-12-04", "2025-12-05"]);
    assert_eq!(results[0]["mileageCost"], 57000);
    assert_eq!(results[0]["cashValue"], 657.6);
    assert!((results[0]["cashCpm"].as_f64().unwrap() - 1.0).abs() < 1e-9);

    let session_id = body["sessionId"].as_str().unwrap().to_string();
    let (status, stored) = send(h.router(), get(&format!("/api/redemption/{}", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["results"], body["results"]);

    // second search is served from the fare cache
    assert_eq!(h.fares.calls.load(Ordering::SeqCst), 2);
    let (status, _) = send(h.router(), post_json("/api/redemption", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.fares.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_search_fails_when_no_day_could_be_searched() {
    let h = Harness::new(FakeAwards { always_fail: true, ..Default::default() });
    let request = json!({ "origin": "DFW", "destination": "LHR", "date": "2025-12-05", "cabin": "business" });

    let (status, body) = send(h.router(), post_json("/api/redemption", request.clone())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "search_failed");

    // breaker threshold is 1: the next search never reaches the partner
    let (status, _) = send(h.router(), post_json("/api/redemption", request)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(h.awards.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let h = Harness::new(FakeAwards::default());
    let (status, body) = send(h.router(), get("/api/redemption/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");
}

// ============================================================================
// Wizard against the live router
// ============================================================================

struct RouterSearch(Router);

#[async_trait]
impl SearchCollaborator for RouterSearch {
    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResult, SearchTransportError> {
        let body = serde_json::to_value(criteria).map_err(|e| SearchTransportError::Decode(e.to_string()))?;
        let (status, body) = send(self.0.clone(), post_json("/api/redemption", body)).await;
        if !status.is_success() {
            return Err(SearchTransportError::Status(status.as_u16()));
        }
        serde_json::from_value(body).map_err(|e| SearchTransportError::Decode(e.to_string()))
    }
}

#[tokio::test]
async fn test_submission_flow_round_trip() {
    let h = Harness::new(FakeAwards::default());
    let local = Arc::new(LocalStore::in_memory());
    let flow = SearchFlow::new(Arc::new(RouterSearch(h.router())), local.clone());

    let criteria = SearchCriteria {
        origin: "DFW".into(),
        destination: "LHR".into(),
        date: day(5),
        flex_days: 0,
        passengers: 1,
        cabin: Cabin::Business,
        program: "american".into(),
        mode: DateMode::Exact,
        direct: YesNo::No,
        multi: YesNo::No,
        positioning: YesNo::No,
    };

    let SubmitOutcome::Navigate(target) = flow.submit(&criteria).await.unwrap() else {
        panic!("expected navigation");
    };
    let session_id = local.get_item(LAST_SESSION_KEY).unwrap();
    assert_eq!(target, format!("/dev/redemption-results.html?session={}", session_id));
    assert!(local.get_item(LATEST_RESULTS_KEY).unwrap().contains("\"mileageCost\":57000"));
}

// ============================================================================
// Plaid, Duffel, middleware
// ============================================================================

#[tokio::test]
async fn test_plaid_exchange_then_accounts() {
    let h = Harness::new(FakeAwards::default());

    let (status, body) = send(h.router(), get("/api/plaid/link-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["link_token"], "link-cs-session-user");

    let exchange = json!({ "public_token": "public-good", "institution": { "institution_id": "ins_3", "name": "Chase" } });
    let (status, body) = send(h.router(), post_json("/api/plaid/exchange", exchange)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "plaid_item_id": "item-1" }));

    let (status, body) = send(h.router(), get("/api/plaid/accounts?item_id=item-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], "access-1");
}

#[tokio::test]
async fn test_plaid_error_codes() {
    let h = Harness::new(FakeAwards::default());

    let (status, body) = send(h.router(), post_json("/api/plaid/exchange", json!({ "public_token": "public-bad" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_exchange_response");

    let (_, body) = send(h.router(), get("/api/plaid/accounts")).await;
    assert_eq!(body["error"], "missing_item_id");

    let (status, body) = send(h.router(), get("/api/plaid/accounts?item_id=item-9")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "access_token_not_found");
}

#[tokio::test]
async fn test_duffel_failures_open_the_circuit() {
    let h = Harness::new(FakeAwards::default());
    let request = json!({ "origin": "DFW", "destination": "LHR", "departure_date": "2025-12-05" });

    let (status, body) = send(h.router(), post_json("/api/duffel/offer-requests", request.clone())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "duffel_failed");

    let (status, body) = send(h.router(), post_json("/api/duffel/offer-requests", request)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");
    assert_eq!(h.duffel.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_duffel_rejects_party_size_before_calling_partner() {
    let h = Harness::new(FakeAwards::default());
    let request = json!({
        "origin": "DFW", "destination": "LHR", "departure_date": "2025-12-05", "passengers": 4_000_000_000u32
    });

    let (status, body) = send(h.router(), post_json("/api/duffel/offer-requests", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_parameters");
    assert_eq!(h.duffel.calls.load(Ordering::SeqCst), 0);

    // a rejected body is not a partner failure
    let ok_size = json!({ "origin": "DFW", "destination": "LHR", "departure_date": "2025-12-05", "passengers": 9 });
    let (status, _) = send(h.router(), post_json("/api/duffel/offer-requests", ok_size)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(h.duffel.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fusion_joins_cash_fare_with_sample_award() {
    let h = Harness::new(FakeAwards::default());
    let (status, body) = send(h.router(), get("/api/test-fusion?origin=dfw&destination=lhr&date=2025-12-05")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["origin"], "DFW");
    assert_eq!(body["cabin"], "business");
    assert_eq!(body["cashValue"], 657.6);
    assert_eq!(body["award"]["mileageCost"], 57000);
    assert!((body["cpm"].as_f64().unwrap() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_bulk_availability_is_not_a_session_lookup() {
    let h = Harness::new(FakeAwards::default());
    let (status, body) = send(h.router(), get("/api/redemption/testBulk?month=2025-10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"], "aeroplan");
    assert_eq!(body["region"], "NorthAmerica-Europe");
    assert_eq!(body["month"], "2025-10");
    assert_eq!(h.awards.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rate_limit() {
    let h = Harness::with_limits(FakeAwards::default(), 2, 1, PathBuf::from("dev"));
    for _ in 0..2 {
        let (status, _) = send(h.router(), get("/api/test")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(h.router(), get("/api/test")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
}

#[tokio::test]
async fn test_static_pages_under_dev() {
    let dir = std::env::temp_dir().join(format!("concierge-static-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("redemption-results.html"), "<table id=\"resultsTable\"></table>").unwrap();

    let h = Harness::with_limits(FakeAwards::default(), 1_000, 1, dir.clone());
    let response = h.router().oneshot(get("/dev/redemption-results.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(std::str::from_utf8(&bytes).unwrap().contains("resultsTable"));

    let (status, _) = send(h.router(), get("/dev/missing.html")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_static_pages_do_not_count_against_rate_limit() {
    let dir = std::env::temp_dir().join(format!("concierge-static-limit-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("redem-con.html"), "<section id=\"searchPanel\"></section>").unwrap();

    let h = Harness::with_limits(FakeAwards::default(), 2, 1, dir.clone());
    for _ in 0..5 {
        let (status, _) = send(h.router(), get("/dev/redem-con.html")).await;
        assert_eq!(status, StatusCode::OK);
    }
    for _ in 0..2 {
        let (status, _) = send(h.router(), get("/api/test")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(h.router(), get("/api/test")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let _ = std::fs::remove_dir_all(&dir);
}
