//! Person matching client (Bionomia)
//!
//! Two lookups against the same service:
//! - **Fuzzy** (`user.json`): one scored top candidate per name, accepted when
//!   the score reaches the cutoff.
//! - **Strict** (`users/search`): date-scoped search that only returns people
//!   alive and active in the given year. Every request waits
//!   `verify.request_interval_ms` (1 s by default) before it is sent, and a
//!   rate limiter keeps concurrent `verify` calls on one matcher at least
//!   that far apart.
//!
//! Any failed request aborts the whole call; no partial results are returned.

use crate::error::{ReconcileError, ReconcileResult};
use crate::services::http::{build_client, check_status, endpoint, read_json};
use crate::types::{DetailPerson, MatchOutcome, MatchRecord, ScoredPerson, VerifiedMatch};
use crate::utils::retry::{retry_transient, RetryPolicy};
use collink_common::config::{HttpConfig, TomlConfig};
use futures::stream::{self, StreamExt, TryStreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Default minimum score for a fuzzy match
pub const DEFAULT_CUTOFF_SCORE: f64 = 50.0;

/// Default spacing between strict search requests
pub const DEFAULT_VERIFY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct StrictSearchResponse {
    #[serde(rename = "opensearch:totalResults")]
    total_results: u64,
    #[serde(rename = "dataFeedElement", default)]
    data_feed_element: Vec<FeedElement>,
}

#[derive(Debug, Deserialize)]
struct FeedElement {
    item: DetailPerson,
}

/// Person matching client
pub struct PersonMatcher {
    http_client: Client,
    base_url: String,
    /// Fuzzy lookups in flight at once
    concurrency: usize,
    /// Spacing across concurrent strict searches; `None` when the interval is zero
    verify_limiter: Option<DefaultDirectRateLimiter>,
    verify_interval: Duration,
    retry: RetryPolicy,
}

impl PersonMatcher {
    pub fn new(
        base_url: impl Into<String>,
        http: &HttpConfig,
        verify_interval: Duration,
    ) -> ReconcileResult<Self> {
        Ok(Self {
            http_client: build_client(http)?,
            base_url: base_url.into(),
            concurrency: 1,
            verify_limiter: Quota::with_period(verify_interval).map(RateLimiter::direct),
            verify_interval,
            retry: RetryPolicy::from_config(http),
        })
    }

    pub fn from_config(config: &TomlConfig) -> ReconcileResult<Self> {
        Ok(Self::new(
            &config.endpoints.person_base,
            &config.http,
            config.verify.request_interval(),
        )?
        .with_concurrency(config.matching.concurrency))
    }

    /// Allow up to `concurrency` fuzzy lookups in flight; output order is kept
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn verify_interval(&self) -> Duration {
        self.verify_interval
    }

    /// Fuzzy-match every name, splitting them into matches and unmatches
    ///
    /// A name is unmatched when the service returns no candidate or the top
    /// candidate scores below `cutoff_score` (NaN scores count as below).
    pub async fn match_names(
        &self,
        names: &[String],
        cutoff_score: f64,
    ) -> ReconcileResult<MatchOutcome> {
        tracing::info!(
            names = names.len(),
            cutoff_score,
            concurrency = self.concurrency,
            "Fuzzy matching collector names"
        );

        let lookups: Vec<(&String, Option<ScoredPerson>)> = stream::iter(names)
            .map(|name| async move { self.top_candidate(name).await.map(|c| (name, c)) })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut outcome = MatchOutcome::default();
        for (name, candidate) in lookups {
            match candidate {
                Some(candidate) if candidate.score >= cutoff_score => {
                    outcome.matches.push(MatchRecord {
                        original_name: name.clone(),
                        confidence_score: candidate.score,
                        matched_identity: candidate.person,
                    });
                }
                Some(candidate) => {
                    tracing::debug!(
                        name = %name,
                        score = candidate.score,
                        "Top candidate below cutoff"
                    );
                    outcome.unmatches.push(name.clone());
                }
                None => outcome.unmatches.push(name.clone()),
            }
        }

        tracing::info!(
            matches = outcome.matches.len(),
            unmatches = outcome.unmatches.len(),
            "Fuzzy matching complete"
        );
        Ok(outcome)
    }

    /// Best fuzzy candidate for one name, `None` when the service has nobody
    pub async fn top_candidate(&self, name: &str) -> ReconcileResult<Option<ScoredPerson>> {
        let url = endpoint(&self.base_url, "user.json");
        let http_client = &self.http_client;
        let url = url.as_str();

        let candidates: Vec<ScoredPerson> =
            retry_transient("fuzzy person lookup", self.retry, move || async move {
                tracing::debug!(name, "Querying fuzzy person match");
                let response = http_client
                    .get(url)
                    .query(&[("q", name), ("limit", "1")])
                    .send()
                    .await?;
                let response = check_status(response).await?;
                read_json(response, "fuzzy person match").await
            })
            .await?;

        Ok(candidates.into_iter().next())
    }

    /// Re-check matches with the strict, date-scoped search
    ///
    /// Every record comes back; `detail_match` is set only when the strict
    /// search found someone.
    pub async fn verify(
        &self,
        matches: Vec<MatchRecord>,
        year: i32,
    ) -> ReconcileResult<Vec<VerifiedMatch>> {
        tracing::info!(
            records = matches.len(),
            year,
            interval_ms = self.verify_interval.as_millis() as u64,
            "Strict verification of matches"
        );

        let mut verified = Vec::with_capacity(matches.len());
        for record in matches {
            let detail_match = self.strict_lookup(&record.original_name, year).await?;
            if detail_match.is_none() {
                tracing::debug!(
                    name = %record.original_name,
                    year,
                    "No strict match"
                );
            }
            verified.push(VerifiedMatch {
                record,
                detail_match,
            });
        }

        tracing::info!(
            confirmed = verified.iter().filter(|v| v.is_confirmed()).count(),
            total = verified.len(),
            "Strict verification complete"
        );
        Ok(verified)
    }

    /// First strict search result for `name` in `year`
    ///
    /// Waits the verify interval before the request, including the first one.
    pub async fn strict_lookup(&self, name: &str, year: i32) -> ReconcileResult<Option<DetailPerson>> {
        let url = endpoint(&self.base_url, "users/search");
        let http_client = &self.http_client;
        let url = url.as_str();
        let limiter = self.verify_limiter.as_ref();
        let interval = self.verify_interval;
        let params = [
            ("q", name.to_string()),
            ("date", year.to_string()),
            ("strict", "true".to_string()),
            ("limit", "1".to_string()),
        ];
        let params = &params;

        let response: StrictSearchResponse =
            retry_transient("strict person search", self.retry, move || async move {
                if let Some(limiter) = limiter {
                    tokio::time::sleep(interval).await;
                    limiter.until_ready().await;
                }
                tracing::debug!(name, year, "Querying strict person search");
                let response = http_client.get(url).query(params).send().await?;
                let response = check_status(response).await?;
                read_json(response, "strict person search").await
            })
            .await?;

        if response.total_results == 0 {
            return Ok(None);
        }

        let first = response.data_feed_element.into_iter().next().ok_or_else(|| {
            ReconcileError::Parse(format!(
                "strict search reported {} results for '{}' but returned none",
                response.total_results, name
            ))
        })?;

        Ok(Some(first.item))
    }
}
