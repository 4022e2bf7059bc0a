//! Shared HTTP plumbing for the service clients
//!
//! Every client is built with explicit timeouts and the collink user agent.
//! Status codes are mapped onto `ReconcileError` here so each client only
//! deals with successful bodies.

use crate::error::{ReconcileError, ReconcileResult};
use collink_common::config::{user_agent, HttpConfig};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// Build a reqwest client from HTTP settings
pub fn build_client(http: &HttpConfig) -> ReconcileResult<Client> {
    let client = Client::builder()
        .user_agent(user_agent(http.client_identity.as_deref()))
        .timeout(http.request_timeout())
        .connect_timeout(http.connect_timeout())
        .build()?;
    Ok(client)
}

/// Pass successful responses through, map everything else to an error
pub async fn check_status(response: Response) -> ReconcileResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();

    if status.as_u16() == 429 || status.as_u16() == 503 {
        return Err(ReconcileError::RateLimited {
            status: status.as_u16(),
            url,
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(ReconcileError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

/// Read the body and decode it as JSON, reporting shape problems as `Parse`
pub async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> ReconcileResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ReconcileError::Parse(format!("{} response: {}", what, e)))
}

/// Join a base URL and a path without doubling slashes
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
