use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use concierge_core::{
    AirportSource, Cabin, DateMode, ResultsLoadError, ResultsSource, SearchCollaborator, SearchCriteria,
    SearchTransportError, YesNo,
};
use concierge_partners::{
    http_client, AwardAvailability, BulkQuery, CashFareSource, DayQuery, DuffelApi, DuffelClient, HttpAirportSource,
    HttpResultsSource, HttpSearchClient, PartnerError, PlaidApi, PlaidClient, SeatsAeroClient, SerpApiClient,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

async fn seats_search(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    if headers.get("Partner-Authorization").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })));
    }
    if q.get("origin_airport").map(String::as_str) == Some("ERR") {
        return (StatusCode::BAD_GATEWAY, Json(json!({ "error": "upstream" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": [{
                "Date": q["start_date"],
                "Source": "american",
                "Route": { "OriginAirport": q["origin_airport"], "DestinationAirport": q["destination_airport"] },
                "YMileageCost": "30000",
                "YTotalTaxes": 5600,
                "OnlyDirect": q["only_direct_flights"],
                "Take": q["take"]
            }]
        })),
    )
}

async fn seats_bulk(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    if headers.get("Partner-Authorization").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })));
    }
    (StatusCode::OK, Json(json!({ "data": [], "query": q })))
}

async fn serp_search(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let price = match q.get("travel_class").map(String::as_str) {
        Some("3") => json!("$2,480"),
        _ => json!(640),
    };
    Json(json!({ "best_flights": [{ "price": price }], "type": q["type"] }))
}

async fn duffel_offer_request(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let version = headers.get("Duffel-Version").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    let auth = headers.get("Authorization").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    Json(json!({ "version": version, "auth": auth, "echo": body }))
}

async fn plaid_exchange(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["client_id"], "cid");
    assert_eq!(body["secret"], "sec");
    Json(json!({ "item_id": "item-1", "access_token": "access-1", "request_id": "r1" }))
}

async fn redemption(Json(body): Json<Value>) -> impl IntoResponse {
    if body["origin"] == "BAD" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "internal_error" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "sessionId": "sess-1",
            "results": [{
                "date": body["date"],
                "originAirport": body["origin"],
                "destinationAirport": body["destination"],
                "source": "american",
                "mileageCost": 60000,
                "taxesCents": 5600
            }]
        })),
    )
}

async fn stored_session(Path(id): Path<String>) -> impl IntoResponse {
    if id == "sess-1" {
        (StatusCode::OK, Json(json!({ "results": [] })))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
    }
}

async fn airports() -> Json<Value> {
    Json(json!([
        { "iata": "DFW", "icao": "KDFW", "airport": "Dallas Fort Worth", "region_name": "Texas" },
        { "iata": "LHR", "icao": "EGLL", "airport": "London Heathrow" }
    ]))
}

async fn spawn_fake() -> String {
    let app = Router::new()
        .route("/partnerapi/search", get(seats_search))
        .route("/partnerapi/bulk-availability", get(seats_bulk))
        .route("/search.json", get(serp_search))
        .route("/air/offer_requests", post(duffel_offer_request))
        .route("/item/public_token/exchange", post(plaid_exchange))
        .route("/api/redemption", post(redemption))
        .route("/api/redemption/{id}", get(stored_session))
        .route("/airports.json", get(airports));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    http_client(Duration::from_secs(5)).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 5).unwrap()
}

#[tokio::test]
async fn test_seats_aero_sends_partner_header_and_direct_flag() {
    let base = spawn_fake().await;
    let seats = SeatsAeroClient::new(client(), format!("{}/partnerapi/", base), "test-key");

    let query = DayQuery { origin: "DFW", destination: "LHR", day: day(), take: 40, direct_only: true };
    let records = seats.search_day(&query).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, day());
    assert_eq!(records[0].fields["OnlyDirect"], "true");
    assert_eq!(records[0].fields["Take"], "40");
    assert!(records[0].passes_sanity(Cabin::Economy));
}

#[tokio::test]
async fn test_seats_aero_errors() {
    let base = spawn_fake().await;
    let query = DayQuery { origin: "ERR", destination: "LHR", day: day(), take: 40, direct_only: false };

    let seats = SeatsAeroClient::new(client(), format!("{}/partnerapi", base), "test-key");
    match seats.search_day(&query).await {
        Err(PartnerError::Status { code, .. }) => assert_eq!(code, 502),
        other => panic!("expected status error, got {:?}", other.map(|r| r.len())),
    }

    let unkeyed = SeatsAeroClient::new(client(), format!("{}/partnerapi", base), "");
    assert!(matches!(unkeyed.search_day(&query).await, Err(PartnerError::MissingCredentials(_))));
}

#[tokio::test]
async fn test_seats_aero_bulk_availability() {
    let base = spawn_fake().await;
    let seats = SeatsAeroClient::new(client(), format!("{}/partnerapi", base), "test-key");
    let query = BulkQuery { source: "aeroplan", region: "NorthAmerica-Europe", month: "2025-10" };

    let doc = seats.bulk_availability(&query).await.unwrap();
    assert_eq!(doc["query"]["sources"], "aeroplan");
    assert_eq!(doc["query"]["region"], "NorthAmerica-Europe");
    assert_eq!(doc["query"]["month"], "2025-10");

    let wrong_key = SeatsAeroClient::new(client(), format!("{}/partnerapi", base), "other");
    assert!(matches!(
        wrong_key.bulk_availability(&query).await,
        Err(PartnerError::Status { code: 401, .. })
    ));
}

#[tokio::test]
async fn test_serpapi_parses_fares_per_class() {
    let base = spawn_fake().await;
    let serp = SerpApiClient::new(client(), base, Some("serp-key".into()));

    assert_eq!(serp.cash_fare("DFW", "LHR", day(), 1).await.unwrap(), Some(640.0));
    assert_eq!(serp.cash_fare("DFW", "LHR", day(), 3).await.unwrap(), Some(2480.0));
}

#[tokio::test]
async fn test_duffel_and_plaid_headers() {
    let base = spawn_fake().await;

    let duffel = DuffelClient::new(client(), &base, "duffel-key", "v2");
    let reply = duffel.create_offer_request(&json!({ "data": {} })).await.unwrap();
    assert_eq!(reply["version"], "v2");
    assert_eq!(reply["auth"], "Bearer duffel-key");

    let plaid = PlaidClient::new(client(), &base, "cid", "sec", "ConciergeSync");
    let exchange = plaid.exchange_public_token("public-1").await.unwrap();
    assert_eq!(exchange.item_id.as_deref(), Some("item-1"));
    assert_eq!(exchange.access_token.as_deref(), Some("access-1"));

    let unconfigured = PlaidClient::new(client(), &base, "", "", "ConciergeSync");
    assert!(matches!(unconfigured.accounts("a").await, Err(PartnerError::MissingCredentials(_))));
}

fn criteria(origin: &str) -> SearchCriteria {
    SearchCriteria {
        origin: origin.into(),
        destination: "LHR".into(),
        date: day(),
        flex_days: 0,
        passengers: 1,
        cabin: Cabin::Economy,
        program: String::new(),
        mode: DateMode::Exact,
        direct: YesNo::No,
        multi: YesNo::No,
        positioning: YesNo::No,
    }
}

#[tokio::test]
async fn test_site_clients() {
    let base = spawn_fake().await;

    let search = HttpSearchClient::new(client(), &base);
    let result = search.search(&criteria("DFW")).await.unwrap();
    assert_eq!(result.session_id.as_deref(), Some("sess-1"));
    assert_eq!(result.results[0].origin_airport, "DFW");
    assert_eq!(search.search(&criteria("BAD")).await, Err(SearchTransportError::Status(500)));

    let results = HttpResultsSource::new(client(), &base);
    assert!(results.fetch("sess-1").await.unwrap().is_empty());
    assert_eq!(results.fetch("gone").await, Err(ResultsLoadError::NotFound("gone".into())));

    let airports = HttpAirportSource::new(client(), format!("{}/airports.json", base));
    let records = airports.fetch().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].region_name, None);
}
