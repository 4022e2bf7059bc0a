//! Test helpers: in-process stub services for the external APIs
//!
//! Each stub is an axum router bound to an ephemeral localhost port, so the
//! real reqwest-based clients run unchanged against it.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use collink_common::config::{HttpConfig, TomlConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub type Params = HashMap<String, String>;

/// Serve `router` on 127.0.0.1 and return its base URL
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// HTTP settings with short timeouts and a test identity
pub fn test_http_config() -> HttpConfig {
    HttpConfig {
        request_timeout_ms: 5_000,
        connect_timeout_ms: 2_000,
        client_identity: Some("collink-tests".to_string()),
        max_retries: 0,
        retry_initial_backoff_ms: 10,
    }
}

/// Full config pointing every endpoint at `base_url`, without pacing
pub fn test_config(base_url: &str) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.http = test_http_config();
    config.endpoints.occurrence_base = base_url.to_string();
    config.endpoints.person_base = base_url.to_string();
    config.endpoints.sparql_endpoint = format!("{}/sparql", base_url);
    config.verify.request_interval_ms = 0;
    config
}

/// Respond with `status` for the first `count` requests
#[derive(Default)]
pub struct Failures {
    remaining: AtomicUsize,
    status: Mutex<Option<StatusCode>>,
}

impl Failures {
    pub fn set(&self, count: usize, status: StatusCode) {
        self.remaining.store(count, Ordering::SeqCst);
        *self.status.lock().unwrap() = Some(status);
    }

    fn take(&self) -> Option<StatusCode> {
        let status = (*self.status.lock().unwrap())?;
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| status)
    }
}

// ============================================================================
// Occurrence service
// ============================================================================

/// Occurrence search stub serving `pages` by offset / limit
#[derive(Default)]
pub struct OccurrenceStub {
    pub pages: Vec<Value>,
    /// Never report end of records
    pub endless: bool,
    pub species: HashMap<String, Value>,
    pub requests: Mutex<Vec<Params>>,
    pub failures: Failures,
}

impl OccurrenceStub {
    pub fn with_pages(pages: Vec<Value>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn offsets(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.get("offset").cloned().unwrap_or_default())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Occurrence page with one record per collector string
pub fn occurrence_page(recorded_by: &[&str], end_of_records: bool) -> Value {
    let results: Vec<Value> = recorded_by
        .iter()
        .enumerate()
        .map(|(i, name)| json!({ "key": i, "recordedBy": name }))
        .collect();
    json!({
        "offset": 0,
        "limit": 300,
        "endOfRecords": end_of_records,
        "results": results
    })
}

async fn occurrence_search(
    State(stub): State<Arc<OccurrenceStub>>,
    Query(params): Query<Params>,
) -> Response {
    stub.requests.lock().unwrap().push(params.clone());

    if let Some(status) = stub.failures.take() {
        return (status, "service unavailable").into_response();
    }

    if stub.endless {
        return Json(occurrence_page(&["Endless, E."], false)).into_response();
    }

    let offset: usize = params.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .filter(|l| *l > 0)
        .unwrap_or(300);

    match stub.pages.get(offset / limit) {
        Some(page) => Json(page.clone()).into_response(),
        None => Json(json!({ "results": [], "endOfRecords": true })).into_response(),
    }
}

async fn species(
    State(stub): State<Arc<OccurrenceStub>>,
    axum::extract::Path(key): axum::extract::Path<String>,
) -> Response {
    match stub.species.get(&key) {
        Some(body) => Json(body.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

pub fn occurrence_routes(stub: Arc<OccurrenceStub>) -> Router {
    Router::new()
        .route("/occurrence/search", get(occurrence_search))
        .route("/species/:key", get(species))
        .with_state(stub)
}

// ============================================================================
// Person matching service
// ============================================================================

/// Fuzzy and strict person search stub keyed by query name
#[derive(Default)]
pub struct PersonStub {
    /// Name to `user.json` body; unknown names get `[]`
    pub fuzzy: HashMap<String, Value>,
    /// Name to `users/search` body; unknown names get zero results
    pub strict: HashMap<String, Value>,
    pub fuzzy_requests: Mutex<Vec<Params>>,
    pub strict_requests: Mutex<Vec<(Params, Instant)>>,
    pub failures: Failures,
}

impl PersonStub {
    pub fn fuzzy_names(&self) -> Vec<String> {
        self.fuzzy_requests
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.get("q").cloned().unwrap_or_default())
            .collect()
    }
}

/// `user.json` body with one candidate
pub fn fuzzy_candidate(fullname: &str, score: f64) -> Value {
    json!([{
        "id": 1000,
        "score": score,
        "fullname": fullname,
        "fullname_reverse": fullname,
        "orcid": null,
        "wikidata": "Q157683",
        "lifespan": "1817 – 1911",
        "thumbnail": "https://example.org/thumb.jpg"
    }])
}

/// `users/search` body with one person
pub fn strict_result(name: &str, qid: &str) -> Value {
    json!({
        "@context": "http://schema.org",
        "@type": "DataFeed",
        "opensearch:totalResults": 1,
        "opensearch:itemsPerPage": 1,
        "dataFeedElement": [{
            "@type": "DataFeedItem",
            "item": {
                "@type": "Person",
                "@id": format!("https://bionomia.net/{}", qid),
                "name": name,
                "sameAs": [format!("http://www.wikidata.org/entity/{}", qid)]
            }
        }]
    })
}

pub fn strict_empty() -> Value {
    json!({
        "@context": "http://schema.org",
        "@type": "DataFeed",
        "opensearch:totalResults": 0,
        "opensearch:itemsPerPage": 1,
        "dataFeedElement": []
    })
}

async fn fuzzy_search(State(stub): State<Arc<PersonStub>>, Query(params): Query<Params>) -> Response {
    stub.fuzzy_requests.lock().unwrap().push(params.clone());

    if let Some(status) = stub.failures.take() {
        return (status, "failure").into_response();
    }

    let name = params.get("q").cloned().unwrap_or_default();
    match stub.fuzzy.get(&name) {
        Some(body) => Json(body.clone()).into_response(),
        None => Json(json!([])).into_response(),
    }
}

async fn strict_search(State(stub): State<Arc<PersonStub>>, Query(params): Query<Params>) -> Response {
    stub.strict_requests
        .lock()
        .unwrap()
        .push((params.clone(), Instant::now()));

    if let Some(status) = stub.failures.take() {
        return (status, "failure").into_response();
    }

    let name = params.get("q").cloned().unwrap_or_default();
    match stub.strict.get(&name) {
        Some(body) => Json(body.clone()).into_response(),
        None => Json(strict_empty()).into_response(),
    }
}

pub fn person_routes(stub: Arc<PersonStub>) -> Router {
    Router::new()
        .route("/user.json", get(fuzzy_search))
        .route("/users/search", get(strict_search))
        .with_state(stub)
}

// ============================================================================
// SPARQL endpoint
// ============================================================================

/// SPARQL stub returning `body` and recording request headers and params
#[derive(Default)]
pub struct SparqlStub {
    pub body: Value,
    pub status: Option<StatusCode>,
    pub requests: Mutex<Vec<(Params, HeaderMap)>>,
}

async fn sparql(
    State(stub): State<Arc<SparqlStub>>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    stub.requests.lock().unwrap().push((params, headers));
    match stub.status {
        Some(status) => (status, "query failed").into_response(),
        None => Json(stub.body.clone()).into_response(),
    }
}

pub fn sparql_routes(stub: Arc<SparqlStub>) -> Router {
    Router::new().route("/sparql", get(sparql)).with_state(stub)
}
