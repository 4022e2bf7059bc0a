//! SPARQL bridge against a stub endpoint

mod helpers;

use axum::http::StatusCode;
use collink_match::services::knowledge_base::{self, KnowledgeBaseClient};
use collink_match::ReconcileError;
use helpers::{spawn_stub, sparql_routes, test_config, test_http_config, SparqlStub};
use serde_json::json;
use std::sync::Arc;

const BOTANISTS: &str = "SELECT ?botanist WHERE { ?botanist wdt:P428 ?abbrev . } LIMIT 2";

fn botanist_results() -> serde_json::Value {
    json!({
        "head": { "vars": ["botanist", "botanistLabel"] },
        "results": {
            "bindings": [
                {
                    "botanist": { "type": "uri", "value": "http://www.wikidata.org/entity/Q157683" },
                    "botanistLabel": { "xml:lang": "en", "type": "literal", "value": "Joseph Dalton Hooker" }
                },
                {
                    "botanist": { "type": "uri", "value": "http://www.wikidata.org/entity/Q12345" }
                }
            ]
        }
    })
}

#[tokio::test]
async fn test_query_returns_rows_and_identifiers() {
    let stub = Arc::new(SparqlStub {
        body: botanist_results(),
        ..Default::default()
    });
    let base_url = spawn_stub(sparql_routes(stub.clone())).await;
    let client = KnowledgeBaseClient::new(&test_http_config(), "jdoe@example.org").unwrap();

    let results = client
        .query(&format!("{}/sparql", base_url), BOTANISTS)
        .await
        .unwrap();

    assert_eq!(results.rows().len(), 2);
    assert_eq!(results.rows()[0]["botanistLabel"].value, "Joseph Dalton Hooker");
    assert_eq!(results.identifiers().unwrap(), vec!["Q157683", "Q12345"]);
    assert_eq!(
        knowledge_base::extract_identifier(&results.rows()[1]).unwrap(),
        "Q12345"
    );

    let requests = stub.requests.lock().unwrap();
    let (params, headers) = &requests[0];
    assert_eq!(params["query"], BOTANISTS);
    assert_eq!(params["format"], "json");
    assert_eq!(headers["accept"], "application/sparql-results+json");
    let agent = headers["user-agent"].to_str().unwrap();
    assert!(agent.starts_with("collink/"));
    assert!(agent.ends_with("(jdoe@example.org)"));
}

#[tokio::test]
async fn test_query_uses_configured_endpoint() {
    let stub = Arc::new(SparqlStub {
        body: botanist_results(),
        ..Default::default()
    });
    let base_url = spawn_stub(sparql_routes(stub.clone())).await;
    let client = KnowledgeBaseClient::from_config(&test_config(&base_url)).unwrap();

    let results = client.query_configured(BOTANISTS).await.unwrap();

    assert_eq!(results.identifiers().unwrap(), vec!["Q157683", "Q12345"]);
    let requests = stub.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let agent = requests[0].1["user-agent"].to_str().unwrap();
    assert!(agent.ends_with("(collink-tests)"));
}

#[tokio::test]
async fn test_one_shot_query() {
    let stub = Arc::new(SparqlStub {
        body: botanist_results(),
        ..Default::default()
    });
    let base_url = spawn_stub(sparql_routes(stub.clone())).await;

    let results = knowledge_base::query(&format!("{}/sparql", base_url), BOTANISTS, "jdoe")
        .await
        .unwrap();

    assert_eq!(results.head.vars, vec!["botanist", "botanistLabel"]);
    assert_eq!(results.identifiers().unwrap().len(), 2);
}

#[tokio::test]
async fn test_row_without_botanist_is_malformed() {
    let stub = Arc::new(SparqlStub {
        body: json!({
            "head": { "vars": ["item"] },
            "results": { "bindings": [
                { "item": { "type": "uri", "value": "http://www.wikidata.org/entity/Q1" } }
            ] }
        }),
        ..Default::default()
    });
    let base_url = spawn_stub(sparql_routes(stub)).await;
    let client = KnowledgeBaseClient::new(&test_http_config(), "jdoe").unwrap();

    let results = client
        .query(&format!("{}/sparql", base_url), "SELECT ?item WHERE {}")
        .await
        .unwrap();

    assert!(matches!(
        results.identifiers(),
        Err(ReconcileError::MalformedRow(_))
    ));
}

#[tokio::test]
async fn test_endpoint_error_is_reported() {
    let stub = Arc::new(SparqlStub {
        status: Some(StatusCode::BAD_REQUEST),
        ..Default::default()
    });
    let base_url = spawn_stub(sparql_routes(stub)).await;
    let client = KnowledgeBaseClient::new(&test_http_config(), "jdoe").unwrap();

    let err = client
        .query(&format!("{}/sparql", base_url), "NOT SPARQL")
        .await
        .unwrap_err();

    match err {
        ReconcileError::Status { status, body, .. } => {
            assert_eq!(status, 400);
            assert_eq!(body, "query failed");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_identity_rejected_before_any_request() {
    let err = knowledge_base::query("http://127.0.0.1:1/sparql", BOTANISTS, "")
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Common(_)));
}
