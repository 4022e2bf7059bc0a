//! Knowledge-base bridge (SPARQL)
//!
//! Runs a caller-supplied SPARQL query against a triple store such as the
//! Wikidata Query Service and pulls canonical identifiers (QIDs) out of the
//! result rows. Not part of the harvesting pipeline.

use crate::error::{ReconcileError, ReconcileResult};
use crate::services::http::{build_client, check_status, read_json};
use crate::utils::retry::{retry_transient, RetryPolicy};
use collink_common::config::{EndpointsConfig, HttpConfig, TomlConfig};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variable holding the person URI in botanist queries
pub const BOTANIST_VAR: &str = "botanist";

const SPARQL_JSON: &str = "application/sparql-results+json";

/// One bound value in a result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparqlTerm {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

/// One result row: variable name to bound value
pub type SparqlRow = HashMap<String, SparqlTerm>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparqlHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparqlBindings {
    pub bindings: Vec<SparqlRow>,
}

/// SPARQL JSON result table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: SparqlHead,
    pub results: SparqlBindings,
}

impl SparqlResults {
    pub fn rows(&self) -> &[SparqlRow] {
        &self.results.bindings
    }

    /// Identifiers of every row's `botanist` binding
    pub fn identifiers(&self) -> ReconcileResult<Vec<String>> {
        self.rows().iter().map(extract_identifier).collect()
    }
}

/// SPARQL endpoint client
pub struct KnowledgeBaseClient {
    http_client: reqwest::Client,
    /// Endpoint used by `query_configured`
    endpoint_url: String,
    retry: RetryPolicy,
}

impl KnowledgeBaseClient {
    /// Build a client identified by `client_identity` in its user agent
    ///
    /// Public SPARQL services ask for a contact in the user agent, so an
    /// empty identity is rejected.
    pub fn new(http: &HttpConfig, client_identity: &str) -> ReconcileResult<Self> {
        if client_identity.trim().is_empty() {
            return Err(collink_common::Error::InvalidInput(
                "knowledge-base queries need a client identity".to_string(),
            )
            .into());
        }

        let http = HttpConfig {
            client_identity: Some(client_identity.to_string()),
            ..http.clone()
        };

        Ok(Self {
            http_client: build_client(&http)?,
            endpoint_url: EndpointsConfig::default().sparql_endpoint,
            retry: RetryPolicy::from_config(&http),
        })
    }

    /// Build from config; the identity comes from `http.client_identity` and
    /// the default endpoint from `endpoints.sparql_endpoint`
    pub fn from_config(config: &TomlConfig) -> ReconcileResult<Self> {
        let identity = config.http.client_identity.as_deref().unwrap_or_default();
        Ok(Self::new(&config.http, identity)?.with_endpoint(&config.endpoints.sparql_endpoint))
    }

    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Run `query_text` against the configured endpoint
    pub async fn query_configured(&self, query_text: &str) -> ReconcileResult<SparqlResults> {
        self.query(&self.endpoint_url, query_text).await
    }

    /// Run `query_text` against `endpoint_url` and parse the result table
    pub async fn query(&self, endpoint_url: &str, query_text: &str) -> ReconcileResult<SparqlResults> {
        let http_client = &self.http_client;

        let results: SparqlResults =
            retry_transient("sparql query", self.retry, move || async move {
                tracing::debug!(endpoint = endpoint_url, "Running SPARQL query");
                let response = http_client
                    .get(endpoint_url)
                    .header(ACCEPT, SPARQL_JSON)
                    .query(&[("query", query_text), ("format", "json")])
                    .send()
                    .await?;
                let response = check_status(response).await?;
                read_json(response, "sparql").await
            })
            .await?;

        tracing::info!(rows = results.rows().len(), "SPARQL query complete");
        Ok(results)
    }
}

/// One-shot query with default HTTP settings
pub async fn query(
    endpoint_url: &str,
    query_text: &str,
    client_identity: &str,
) -> ReconcileResult<SparqlResults> {
    KnowledgeBaseClient::new(&HttpConfig::default(), client_identity)?
        .query(endpoint_url, query_text)
        .await
}

/// Canonical identifier from a row's `botanist` URI (its last path segment)
pub fn extract_identifier(row: &SparqlRow) -> ReconcileResult<String> {
    extract_identifier_from(row, BOTANIST_VAR)
}

/// Canonical identifier from the URI bound to `var`
pub fn extract_identifier_from(row: &SparqlRow, var: &str) -> ReconcileResult<String> {
    let term = row
        .get(var)
        .ok_or_else(|| ReconcileError::MalformedRow(format!("no '{}' binding", var)))?;

    match term.value.rsplit_once('/') {
        Some((_, id)) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ReconcileError::MalformedRow(format!(
            "'{}' is not a URI with an identifier segment",
            term.value
        ))),
    }
}
