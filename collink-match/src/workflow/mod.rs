//! Reconciliation workflow
//!
//! Composes the service clients into one harvest → classify → match → verify
//! run. Scheduling and persistence of runs are left to the caller.

pub mod pipeline;

use serde::Serialize;
use uuid::Uuid;

pub use pipeline::{ReconcilePipeline, ReconcileQuery, ReconcileReport};

/// Progress event emitted while a run is in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    StageStarted {
        run_id: Uuid,
        stage: &'static str,
    },
    StageCompleted {
        run_id: Uuid,
        stage: &'static str,
        count: usize,
    },
}
