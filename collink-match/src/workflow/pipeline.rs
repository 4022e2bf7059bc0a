//! Reconciliation pipeline
//!
//! Runs the stages for one taxon/year-range query:
//! - **Harvest**: collector names from occurrence records
//! - **Classify**: full vs thin names
//! - **Match**: fuzzy person matching (full names, or all names)
//! - **Verify**: strict, date-scoped re-check of matches (optional)
//!
//! Any stage failure fails the run; there is no partial report.
//!
//! # Example
//! ```rust,ignore
//! let pipeline = ReconcilePipeline::from_config(&config)?;
//! let report = pipeline.run(&ReconcileQuery::new(1850, 1900, 7707728)).await?;
//! ```

use super::PipelineEvent;
use crate::error::ReconcileResult;
use crate::names::classify;
use crate::services::occurrence_client::{OccurrenceClient, OccurrenceQuery};
use crate::services::person_matcher::{PersonMatcher, DEFAULT_CUTOFF_SCORE};
use crate::types::VerifiedMatch;
use chrono::{DateTime, Utc};
use collink_common::config::TomlConfig;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// One reconciliation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReconcileQuery {
    pub start_year: i32,
    pub end_year: i32,
    pub taxon_key: u64,
    /// Also send thin names to the fuzzy matcher
    pub include_thin: bool,
    /// Year for strict verification; `None` skips verification
    pub verify_year: Option<i32>,
}

impl ReconcileQuery {
    /// Query verifying against `end_year`, matching full names only
    pub fn new(start_year: i32, end_year: i32, taxon_key: u64) -> Self {
        Self {
            start_year,
            end_year,
            taxon_key,
            include_thin: false,
            verify_year: Some(end_year),
        }
    }

    pub fn including_thin(mut self) -> Self {
        self.include_thin = true;
        self
    }

    pub fn verified_in(mut self, year: i32) -> Self {
        self.verify_year = Some(year);
        self
    }

    pub fn without_verification(mut self) -> Self {
        self.verify_year = None;
        self
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub query: ReconcileQuery,
    pub collector_count: usize,
    pub full_names: Vec<String>,
    pub thin_names: Vec<String>,
    pub matches: Vec<VerifiedMatch>,
    pub unmatched: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Pipeline over the occurrence and person services
pub struct ReconcilePipeline {
    occurrences: OccurrenceClient,
    persons: PersonMatcher,
    cutoff_score: f64,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl ReconcilePipeline {
    pub fn new(occurrences: OccurrenceClient, persons: PersonMatcher) -> Self {
        Self {
            occurrences,
            persons,
            cutoff_score: DEFAULT_CUTOFF_SCORE,
            event_tx: None,
        }
    }

    pub fn from_config(config: &TomlConfig) -> ReconcileResult<Self> {
        Ok(Self::new(
            OccurrenceClient::from_config(config)?,
            PersonMatcher::from_config(config)?,
        )
        .with_cutoff(config.matching.cutoff_score))
    }

    pub fn with_cutoff(mut self, cutoff_score: f64) -> Self {
        self.cutoff_score = cutoff_score;
        self
    }

    /// Report stage progress on `event_tx`
    ///
    /// Events are sent without waiting; if the receiver falls behind and the
    /// channel fills up, further events are dropped rather than stalling the run.
    pub fn with_events(mut self, event_tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub async fn run(&self, query: &ReconcileQuery) -> ReconcileResult<ReconcileReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, taxon_key = query.taxon_key, "Reconciliation run started");

        // Harvest
        self.emit(PipelineEvent::StageStarted { run_id, stage: "harvest" });
        let collectors = self
            .occurrences
            .harvest_query(OccurrenceQuery {
                start_year: query.start_year,
                end_year: query.end_year,
                taxon_key: query.taxon_key,
            })
            .await?;
        self.emit(PipelineEvent::StageCompleted {
            run_id,
            stage: "harvest",
            count: collectors.len(),
        });

        // Classify
        let (full_names, thin_names) = classify(&collectors);

        // Match
        let candidates: Vec<String> = if query.include_thin {
            full_names.iter().chain(thin_names.iter()).cloned().collect()
        } else {
            full_names.clone()
        };
        self.emit(PipelineEvent::StageStarted { run_id, stage: "match" });
        let outcome = self.persons.match_names(&candidates, self.cutoff_score).await?;
        self.emit(PipelineEvent::StageCompleted {
            run_id,
            stage: "match",
            count: outcome.matches.len(),
        });

        // Verify
        let matches = match query.verify_year {
            Some(year) => {
                self.emit(PipelineEvent::StageStarted { run_id, stage: "verify" });
                let verified = self.persons.verify(outcome.matches, year).await?;
                self.emit(PipelineEvent::StageCompleted {
                    run_id,
                    stage: "verify",
                    count: verified.iter().filter(|v| v.is_confirmed()).count(),
                });
                verified
            }
            None => {
                debug!(%run_id, "Strict verification skipped");
                outcome.matches.into_iter().map(VerifiedMatch::from).collect()
            }
        };

        let report = ReconcileReport {
            run_id,
            query: *query,
            collector_count: collectors.len(),
            full_names,
            thin_names,
            matches,
            unmatched: outcome.unmatches,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            %run_id,
            collectors = report.collector_count,
            matches = report.matches.len(),
            unmatched = report.unmatched.len(),
            "Reconciliation run complete"
        );
        Ok(report)
    }

    /// Non-blocking: a full or closed channel drops the event
    fn emit(&self, event: PipelineEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(?event, "Pipeline event channel full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Pipeline event receiver dropped");
            }
        }
    }
}
